//! Symbol demangling and name normalization.
//!
//! Two paths turn a linkage name into something a walker can match on:
//!
//! - **Library demangling**: Rust symbols go through `rustc_demangle`, Itanium
//!   C++ symbols through `cpp_demangle`. The demangled text is then split into
//!   owner, member, parameters and qualifiers by [`parse_demangled`].
//! - **Fallback normalizer**: [`normalize_type_name`] and
//!   [`normalize_member_name`] decode the length-prefixed components of an
//!   Itanium name directly. They only understand plain nested names and return
//!   an empty string on anything else.

use cpp_demangle::{DemangleOptions, Symbol};
use rustc_demangle::try_demangle;
use smallvec::SmallVec;

use crate::resolve::DependentTypes;
use crate::types::TypePtr;

/// Built-in type spellings produced by the C++ demanglers.
const BUILTIN_TYPES: &[&str] = &[
    "void",
    "bool",
    "char",
    "signed char",
    "unsigned char",
    "wchar_t",
    "char8_t",
    "char16_t",
    "char32_t",
    "short",
    "unsigned short",
    "int",
    "unsigned int",
    "long",
    "unsigned long",
    "long long",
    "unsigned long long",
    "__int128",
    "unsigned __int128",
    "float",
    "double",
    "long double",
    "__float128",
    "decltype(nullptr)",
    "std::nullptr_t",
    "auto",
    "decltype(auto)",
];

/// Demangler output prefixes for compiler-emitted special symbols.
const SPECIAL_NAME_PREFIXES: &[&str] = &[
    "vtable for ",
    "VTT for ",
    "construction vtable for ",
    "typeinfo for ",
    "typeinfo name for ",
    "guard variable for ",
    "non-virtual thunk to ",
    "virtual thunk to ",
    "covariant return thunk to ",
    "reference temporary",
    "TLS init function for ",
    "TLS wrapper function for ",
    "transaction clone for ",
];

const THUNK_PREFIXES: &[&str] = &["non-virtual thunk to ", "virtual thunk to ", "covariant return thunk to "];

/// Itanium prefixes of the run-time type information symbols.
const TYPE_INFO_PREFIXES: &[&str] = &["_ZTI", "_ZTS", "_ZTV"];

/// Whether `name` is spelled like a built-in type.
pub fn is_builtin_type(name: &str) -> bool
{
    BUILTIN_TYPES.contains(&name)
}

/// Heuristic from legacy Rust mangling: `_ZN...17h<hash>E`.
fn looks_like_legacy_rust(raw: &str) -> bool
{
    raw.starts_with("_ZN") && raw.contains("17h") && raw.ends_with('E')
}

/// Demangle a raw symbol with the matching library demangler.
///
/// Returns `None` for unmangled names and for names neither demangler accepts.
pub fn demangle_symbol(raw: &str) -> Option<String>
{
    if raw.starts_with("_R") || looks_like_legacy_rust(raw) {
        if let Ok(demangled) = try_demangle(raw) {
            // `{:#}` drops the trailing hash segment.
            return Some(format!("{demangled:#}"));
        }
    }

    if raw.starts_with("_Z") {
        let symbol = Symbol::new(raw).ok()?;
        return symbol.demangle(&DemangleOptions::default()).ok();
    }

    None
}

/// Components of a demangled symbol, as needed for matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemangledSymbol
{
    /// Qualified name without parameters (`ns::Shape::area`).
    pub qualified: String,
    /// Everything before the last `::` (`ns::Shape`), if qualified.
    pub owner: Option<String>,
    /// Last component (`area`, `~Shape`, `operator()`).
    pub member: String,
    /// Explicit return type, only present for template instantiations.
    pub return_type: Option<String>,
    /// Parameter spellings, `None` for data symbols.
    pub params: Option<Vec<String>>,
    /// Compiler-emitted helper (vtable, typeinfo, thunk, guard variable).
    pub is_special: bool,
}

/// Demangle `raw` and split it; falls back to the length-prefix decoder when
/// no demangler accepts the name.
pub fn parse_symbol(raw: &str) -> Option<DemangledSymbol>
{
    if let Some(text) = demangle_symbol(raw) {
        return Some(parse_demangled(&text));
    }

    let owner = normalize_type_name(raw);
    let member = normalize_member_name(raw);
    if owner.is_empty() || member.is_empty() || TYPE_INFO_PREFIXES.iter().any(|prefix| raw.starts_with(prefix)) {
        return None;
    }

    Some(DemangledSymbol {
        qualified: format!("{owner}::{member}"),
        owner: Some(owner),
        member,
        ..DemangledSymbol::default()
    })
}

/// Split demangled text such as `ns::Shape::area(int, Bar*) const`.
pub fn parse_demangled(text: &str) -> DemangledSymbol
{
    let text = text.trim();
    if SPECIAL_NAME_PREFIXES.iter().any(|prefix| text.starts_with(prefix)) {
        return DemangledSymbol {
            qualified: text.to_string(),
            member: text.to_string(),
            is_special: true,
            ..DemangledSymbol::default()
        };
    }

    let mut head = text;
    loop {
        if let Some(rest) = head
            .strip_suffix(" const")
            .or_else(|| head.strip_suffix(" volatile"))
            .or_else(|| head.strip_suffix(" &&"))
            .or_else(|| head.strip_suffix(" &"))
            .or_else(|| head.strip_suffix(" noexcept"))
        {
            head = rest;
        } else {
            break;
        }
    }

    let mut params = None;
    if head.ends_with(')') {
        if let Some(open) = matching_open_paren(head) {
            params = Some(split_top_level(&head[open + 1..head.len() - 1], ','));
            head = &head[..open];
        }
    }

    let (return_type, qualified) = split_return_type(head);
    let (owner, member) = split_owner(qualified);

    DemangledSymbol {
        qualified: qualified.to_string(),
        owner: owner.map(str::to_string),
        member: member.to_string(),
        return_type: return_type.map(str::to_string),
        params: params.map(|list| {
            if list.len() == 1 && list[0] == "void" {
                Vec::new()
            } else {
                list
            }
        }),
        is_special: false,
    }
}

/// The method a thunk symbol forwards to, if `raw` is one.
///
/// Thunks are only emitted for virtual functions, so their target is known to
/// be virtual even when the vtable itself is not readable.
pub fn thunk_target(raw: &str) -> Option<DemangledSymbol>
{
    let text = demangle_symbol(raw)?;
    let target = THUNK_PREFIXES
        .iter()
        .find_map(|prefix| text.trim().strip_prefix(prefix))?;
    let parsed = parse_demangled(target);
    parsed.params.is_some().then_some(parsed)
}

/// Index of the `(` that opens the final parenthesized group of `text`.
fn matching_open_paren(text: &str) -> Option<usize>
{
    let mut depth = 0usize;
    for (index, byte) in text.bytes().enumerate().rev() {
        match byte {
            b')' => depth += 1,
            b'(' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

/// Start of the operator name in `text`, when the last component is one.
fn operator_start(text: &str) -> Option<usize>
{
    let index = text.rfind("operator")?;
    let at_component_start = index == 0 || text[..index].ends_with("::") || text[..index].ends_with(' ');
    at_component_start.then_some(index)
}

/// Split `unsigned int Foo::bar<int>` into return type and qualified name.
fn split_return_type(head: &str) -> (Option<&str>, &str)
{
    let limit = operator_start(head).unwrap_or(head.len());
    let mut depth = 0i32;
    let mut split = None;
    for (index, byte) in head[..limit].bytes().enumerate() {
        match byte {
            b'<' | b'(' | b'[' => depth += 1,
            b'>' | b')' | b']' => depth -= 1,
            b' ' if depth == 0 => split = Some(index),
            _ => {}
        }
    }

    match split {
        Some(index) if index + 1 < limit || limit < head.len() => {
            let (ret, name) = head.split_at(index);
            let ret = ret.trim();
            if ret.is_empty() {
                (None, name.trim())
            } else {
                (Some(ret), name.trim())
            }
        }
        _ => (None, head),
    }
}

/// Split `ns::Shape::area` into (`ns::Shape`, `area`).
fn split_owner(qualified: &str) -> (Option<&str>, &str)
{
    let limit = operator_start(qualified).unwrap_or(qualified.len());
    let mut depth = 0i32;
    let mut split = None;
    let bytes = qualified.as_bytes();
    let mut index = 0;
    while index < limit {
        match bytes[index] {
            b'<' | b'(' => depth += 1,
            b'>' | b')' => depth -= 1,
            b':' if depth == 0 && bytes.get(index + 1) == Some(&b':') => {
                split = Some(index);
                index += 1;
            }
            _ => {}
        }
        index += 1;
    }

    match split {
        Some(index) => (Some(&qualified[..index]), &qualified[index + 2..]),
        None => (None, qualified),
    }
}

/// Split on `separator` outside of `<>`, `()` and `[]`.
fn split_top_level(text: &str, separator: char) -> Vec<String>
{
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (index, ch) in text.char_indices() {
        match ch {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            c if c == separator && depth == 0 => {
                parts.push(text[start..index].trim().to_string());
                start = index + ch.len_utf8();
            }
            _ => {}
        }
    }
    let last = text[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last.to_string());
    }
    parts
}

/// Build a `TypePtr` from a demangled type spelling (`char const*`, `Bar&`).
///
/// Named types are recorded in `deps`.
pub fn type_ptr_from_text(text: &str, deps: &mut DependentTypes) -> TypePtr
{
    let text = text.trim();

    // Function and member-function pointers are kept verbatim.
    if text.contains('(') {
        let mut ptr = TypePtr::base(text);
        ptr.is_pointer = text.contains("(*)");
        return ptr;
    }

    let mut ptr = TypePtr::default();
    let mut rest = text;

    if let Some(open) = rest.rfind('[') {
        if rest.ends_with(']') {
            ptr.is_array = true;
            ptr.array_size = rest[open + 1..rest.len() - 1].trim().parse().unwrap_or(0);
            rest = rest[..open].trim_end();
        }
    }

    loop {
        if let Some(stripped) = rest.strip_suffix("&&").or_else(|| rest.strip_suffix('&')) {
            ptr.is_reference = true;
            rest = stripped.trim_end();
        } else if let Some(stripped) = rest.strip_suffix('*') {
            ptr.is_pointer = true;
            rest = stripped.trim_end();
        } else if let Some(stripped) = rest.strip_suffix(" const") {
            ptr.is_constant = true;
            rest = stripped.trim_end();
        } else if let Some(stripped) = rest.strip_suffix(" volatile") {
            rest = stripped.trim_end();
        } else {
            break;
        }
    }

    if let Some(stripped) = rest.strip_prefix("const ") {
        ptr.is_constant = true;
        rest = stripped.trim_start();
    }

    ptr.base_name = rest.to_string();
    ptr.is_base_type = is_builtin_type(rest);
    deps.add_from(&ptr);
    ptr
}

/// Constructor/destructor marker found after the name components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Structor
{
    Constructor,
    Destructor,
}

/// Result of decoding the length-prefixed components of a symbol.
#[derive(Debug)]
struct Components<'a>
{
    parts: SmallVec<[&'a str; 4]>,
    /// `true` for `_ZN...` names, whose last component is a member.
    member_name: bool,
    structor: Option<Structor>,
}

/// Decode `_ZTI`/`_ZTS`/`_ZTV` type symbols and `_ZN` nested names.
fn decode_components(symbol: &str) -> Option<Components<'_>>
{
    let (mut rest, member_name) = if let Some(rest) = TYPE_INFO_PREFIXES.iter().find_map(|prefix| symbol.strip_prefix(prefix)) {
        (rest, false)
    } else if let Some(rest) = symbol.strip_prefix("_Z") {
        (rest, true)
    } else {
        return None;
    };

    let nested = rest.starts_with('N');
    if nested {
        rest = &rest[1..];
        // cv- and ref-qualifiers of member functions
        rest = rest.trim_start_matches(['K', 'V', 'r', 'R', 'O']);
    } else if member_name {
        // A plain `_Z3foo...` is a free function with no owning type.
        return None;
    }

    let mut parts: SmallVec<[&str; 4]> = SmallVec::new();
    loop {
        if nested {
            if let Some(after) = rest.strip_prefix("St") {
                parts.push("std");
                rest = after;
            }
        }

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            break;
        }
        let length: usize = rest[..digits].parse().ok()?;
        if length == 0 {
            break;
        }
        let end = digits.checked_add(length)?;
        let body = rest.get(digits..end)?;
        parts.push(body);
        rest = &rest[end..];

        if !nested {
            break;
        }
    }

    if parts.is_empty() {
        return None;
    }

    let mut structor = None;
    if nested {
        let marker = rest.get(..2);
        structor = match marker {
            Some("C1" | "C2" | "C3") => Some(Structor::Constructor),
            Some("D0" | "D1" | "D2") => Some(Structor::Destructor),
            _ => None,
        };
        if structor.is_some() {
            rest = &rest[2..];
        }
        // Anything but the closing `E` (templates, substitutions) is beyond
        // this decoder.
        if !rest.starts_with('E') {
            return None;
        }
    } else if !rest.is_empty() {
        return None;
    }

    Some(Components {
        parts,
        member_name,
        structor,
    })
}

/// Qualified name of the type a symbol belongs to.
///
/// `_ZTIN2ns5ShapeE` → `ns::Shape`, `_ZN5Shape4areaEv` → `Shape`,
/// `_ZN5ShapeD1Ev` → `Shape`. Empty when the symbol cannot be decoded.
pub fn normalize_type_name(symbol: &str) -> String
{
    let Some(components) = decode_components(symbol) else {
        return String::new();
    };

    let keep = if components.member_name && components.structor.is_none() {
        components.parts.len() - 1
    } else {
        components.parts.len()
    };
    components.parts[..keep].join("::")
}

/// Member name a nested symbol refers to.
///
/// `_ZN5Shape4areaEv` → `area`, `_ZN5ShapeC2Ev` → `Shape`,
/// `_ZN5ShapeD1Ev` → `~Shape`. Empty for type symbols and undecodable input.
pub fn normalize_member_name(symbol: &str) -> String
{
    let Some(components) = decode_components(symbol) else {
        return String::new();
    };
    if !components.member_name {
        return String::new();
    }

    let last = components.parts[components.parts.len() - 1];
    match components.structor {
        Some(Structor::Destructor) => format!("~{last}"),
        _ => last.to_string(),
    }
}

/// Whether `symbol` is run-time type information (`_ZTI`, `_ZTS`, `_ZTV`).
pub fn is_type_info_symbol(symbol: &str) -> bool
{
    TYPE_INFO_PREFIXES.iter().any(|prefix| symbol.starts_with(prefix))
}
