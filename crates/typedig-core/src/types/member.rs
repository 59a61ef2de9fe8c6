//! Fields, methods and their arguments.

use std::fmt;

use super::TypePtr;

/// Member visibility.
///
/// Discriminants follow `DW_ACCESS_*` so DWARF values convert directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Accessibility
{
    /// Not reported by the source format.
    #[default]
    None = 0,
    Public = 1,
    Protected = 2,
    Private = 3,
}

impl Accessibility
{
    pub fn from_dwarf(value: u8) -> Self
    {
        match value {
            1 => Accessibility::Public,
            2 => Accessibility::Protected,
            3 => Accessibility::Private,
            _ => Accessibility::None,
        }
    }
}

impl fmt::Display for Accessibility
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            Accessibility::None => "",
            Accessibility::Public => "public",
            Accessibility::Protected => "protected",
            Accessibility::Private => "private",
        };
        write!(f, "{label}")
    }
}

/// Calling convention of a method.
///
/// The named variants mirror the CodeView `CV_CALL_*` codes, where near and
/// far flavours collapse onto the same keyword.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CallingConvention
{
    /// The platform default (ELF and DWARF sources).
    #[default]
    Default,
    Cdecl,
    Pascal,
    Fastcall,
    Stdcall,
    Syscall,
    Thiscall,
    Mipscall,
    Generic,
    Alphacall,
    Ppccall,
    Superhcall,
    Armcall,
    Am33call,
    Tricall,
    Sh5call,
    M32rcall,
    /// A code outside the CodeView table.
    Other(u8),
}

impl CallingConvention
{
    /// Decode a CodeView `CV_call_e` value.
    pub fn from_codeview(code: u8) -> Self
    {
        match code {
            0x00 | 0x01 => CallingConvention::Cdecl,
            0x02 | 0x03 => CallingConvention::Pascal,
            0x04 | 0x05 => CallingConvention::Fastcall,
            0x07 | 0x08 => CallingConvention::Stdcall,
            0x09 | 0x0a => CallingConvention::Syscall,
            0x0b => CallingConvention::Thiscall,
            0x0c => CallingConvention::Mipscall,
            0x0d => CallingConvention::Generic,
            0x0e => CallingConvention::Alphacall,
            0x0f => CallingConvention::Ppccall,
            0x10 => CallingConvention::Superhcall,
            0x11 => CallingConvention::Armcall,
            0x12 => CallingConvention::Am33call,
            0x13 => CallingConvention::Tricall,
            0x14 => CallingConvention::Sh5call,
            0x15 => CallingConvention::M32rcall,
            other => CallingConvention::Other(other),
        }
    }

    /// Source keyword, empty for the platform default.
    pub fn keyword(self) -> &'static str
    {
        match self {
            CallingConvention::Default | CallingConvention::Other(_) => "",
            CallingConvention::Cdecl => "__cdecl",
            CallingConvention::Pascal => "__pascal",
            CallingConvention::Fastcall => "__fastcall",
            CallingConvention::Stdcall => "__stdcall",
            CallingConvention::Syscall => "__syscall",
            CallingConvention::Thiscall => "__thiscall",
            CallingConvention::Mipscall => "__mipscall",
            CallingConvention::Generic => "__genericcall",
            CallingConvention::Alphacall => "__alphacall",
            CallingConvention::Ppccall => "__ppccall",
            CallingConvention::Superhcall => "__superhcall",
            CallingConvention::Armcall => "__armcall",
            CallingConvention::Am33call => "__am33call",
            CallingConvention::Tricall => "__tricall",
            CallingConvention::Sh5call => "__sh5call",
            CallingConvention::M32rcall => "__m32rcall",
        }
    }
}

impl fmt::Display for CallingConvention
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.keyword())
    }
}

/// A method argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument
{
    /// Source name, or a synthesized one (`arg1`, `this`, `self`).
    pub name: String,
    pub ty: TypePtr,
}

impl Argument
{
    pub fn new(name: impl Into<String>, ty: TypePtr) -> Self
    {
        Self { name: name.into(), ty }
    }

    /// Whether this is the implicit object argument.
    pub fn is_self(&self) -> bool
    {
        self.name == "this" || self.name == "self"
    }
}

/// Name for the `index`-th (1-based) parameter that has no source name.
pub fn synthetic_arg_name(index: usize) -> String
{
    format!("arg{index}")
}

/// A data member or static variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field
{
    pub name: String,
    pub ty: TypePtr,
    /// Byte offset within an instance, 0 for statics.
    pub offset: u64,
    /// Absolute address for statics, 0 when unknown or for instance fields.
    pub address: u64,
    pub is_static: bool,
    pub accessibility: Accessibility,
}

impl Field
{
    /// Instance field at `offset`.
    pub fn instance(name: impl Into<String>, ty: TypePtr, offset: u64) -> Self
    {
        Self {
            name: name.into(),
            ty,
            offset,
            address: 0,
            is_static: false,
            accessibility: Accessibility::None,
        }
    }

    /// Static field, `address` 0 if not yet known.
    pub fn static_at(name: impl Into<String>, ty: TypePtr, address: u64) -> Self
    {
        Self {
            name: name.into(),
            ty,
            offset: 0,
            address,
            is_static: true,
            accessibility: Accessibility::None,
        }
    }

    pub fn with_accessibility(mut self, accessibility: Accessibility) -> Self
    {
        self.accessibility = accessibility;
        self
    }
}

/// A method, either a declaration skeleton or a fully defined one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method
{
    pub name: String,
    /// Linkage name, used for correlation only.
    pub mangled_name: String,
    /// Empty for constructors and destructors.
    pub return_type: TypePtr,
    /// 0 until the definition has been merged.
    pub address: u64,
    pub calling_convention: CallingConvention,
    pub args: Vec<Argument>,
    pub is_static: bool,
    pub is_virtual: bool,
    /// Slot offset in the virtual table, -1 when not virtual.
    pub vftable_offset: i64,
    pub is_variadic: bool,
    pub is_compiler_generated: bool,
    pub accessibility: Accessibility,
}

impl Method
{
    pub fn new(name: impl Into<String>, return_type: TypePtr) -> Self
    {
        Self {
            name: name.into(),
            mangled_name: String::new(),
            return_type,
            address: 0,
            calling_convention: CallingConvention::Default,
            args: Vec::new(),
            is_static: false,
            is_virtual: false,
            vftable_offset: -1,
            is_variadic: false,
            is_compiler_generated: false,
            accessibility: Accessibility::None,
        }
    }

    /// Arguments without a leading implicit `this`/`self`.
    pub fn explicit_args(&self) -> &[Argument]
    {
        strip_self_arg(&self.args)
    }

    /// Whether `name` is a constructor or destructor of `type_name`.
    ///
    /// Only the last component of a qualified type name is compared.
    pub fn is_structor_of(name: &str, type_name: &str) -> bool
    {
        let short = type_name.rsplit("::").next().unwrap_or(type_name);
        name.starts_with('~') || name == short
    }

    /// Force an empty return type on constructors and destructors.
    pub fn apply_structor_rule(&mut self, type_name: &str)
    {
        if Self::is_structor_of(&self.name, type_name) {
            self.return_type = TypePtr::none();
        }
    }
}

/// `args` without a leading implicit object argument.
pub fn strip_self_arg(args: &[Argument]) -> &[Argument]
{
    match args.first() {
        Some(first) if first.is_self() => &args[1..],
        _ => args,
    }
}
