//! Load-time configuration shared by every format loader.

/// Default image base added to PDB relative virtual addresses.
pub const DEFAULT_IMAGE_BASE: u64 = 0x40_0000;

/// Target word width, used where type sizes are guessed from byte counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordSize
{
    Bits32,
    Bits64,
}

impl WordSize
{
    pub fn from_is_64(is_64: bool) -> Self
    {
        if is_64 {
            WordSize::Bits64
        } else {
            WordSize::Bits32
        }
    }

    pub fn bytes(self) -> u64
    {
        match self {
            WordSize::Bits32 => 4,
            WordSize::Bits64 => 8,
        }
    }
}

/// Options passed to [`crate::DebugSource::open`] and the per-format loaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions
{
    /// Added to PDB relative virtual addresses.
    pub image_base: u64,
    /// Overrides the ELF class for size-based type inference and the PDB
    /// machine pointer size.
    pub word_size: Option<WordSize>,
}

impl Default for LoadOptions
{
    fn default() -> Self
    {
        Self {
            image_base: DEFAULT_IMAGE_BASE,
            word_size: None,
        }
    }
}

impl LoadOptions
{
    pub fn with_image_base(mut self, image_base: u64) -> Self
    {
        self.image_base = image_base;
        self
    }

    pub fn with_word_size(mut self, word_size: WordSize) -> Self
    {
        self.word_size = Some(word_size);
        self
    }
}
