//! Turns VM module bytes into a compiled `wasmtime::Module`.
//!
//! The bytes are sniffed rather than trusting a file name: `\0asm` is a binary module,
//! anything whose first significant byte is `(` is WAT text and goes through the `wat`
//! crate first. A UTF-8 BOM and leading whitespace are allowed before WAT.

use std::borrow::Cow;

use wasmtime::{Engine, Module};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("VM module is neither wasm nor wat")]
    UnrecognizedFormat,
    #[error("failed to parse VM module text: {0}")]
    Wat(#[from] wat::Error),
    #[error("failed to compile VM module: {0:#}")]
    Compile(wasmtime::Error),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ModuleFormat {
    Binary,
    Text,
}

const WASM_MAGIC: &[u8] = b"\0asm";
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

pub fn compile_module(engine: &Engine, bytes: &[u8]) -> Result<Module, LoadError> {
    let (format, wasm) = to_binary(bytes)?;
    log::debug!("compiling {format:?} VM module, {} bytes of wasm", wasm.len());
    Module::from_binary(engine, &wasm).map_err(LoadError::Compile)
}

/// The module as binary wasm, borrowed when it already is.
pub fn to_binary(bytes: &[u8]) -> Result<(ModuleFormat, Cow<'_, [u8]>), LoadError> {
    match sniff(bytes).ok_or(LoadError::UnrecognizedFormat)? {
        ModuleFormat::Binary => Ok((ModuleFormat::Binary, Cow::Borrowed(bytes))),
        ModuleFormat::Text => Ok((ModuleFormat::Text, wat::parse_bytes(bytes)?)),
    }
}

pub fn sniff(bytes: &[u8]) -> Option<ModuleFormat> {
    if bytes.starts_with(WASM_MAGIC) {
        return Some(ModuleFormat::Binary);
    }
    let text = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match text.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'(') => Some(ModuleFormat::Text),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_binary_magic() {
        assert_eq!(sniff(b"\0asm\x01\x00\x00\x00"), Some(ModuleFormat::Binary));
    }

    #[test]
    fn sniffs_text_after_bom_and_whitespace() {
        assert_eq!(sniff(b"   \n\t(module)"), Some(ModuleFormat::Text));
        assert_eq!(sniff(b"\xEF\xBB\xBF(module)"), Some(ModuleFormat::Text));
    }

    #[test]
    fn rejects_anything_else() {
        assert_eq!(sniff(b"uxn rom"), None);
        assert_eq!(sniff(b""), None);
        assert_eq!(sniff(b"  \n"), None);
        assert!(matches!(
            to_binary(b"uxn rom"),
            Err(LoadError::UnrecognizedFormat)
        ));
    }

    #[test]
    fn binary_input_is_borrowed() {
        let bytes = wat::parse_str("(module)").unwrap();
        let (format, wasm) = to_binary(&bytes).unwrap();
        assert_eq!(format, ModuleFormat::Binary);
        assert!(matches!(wasm, Cow::Borrowed(_)));
    }

    #[test]
    fn compiles_text_module() {
        let engine = Engine::default();
        assert!(compile_module(&engine, b"(module (func (export \"init\")))").is_ok());
    }

    #[test]
    fn bad_text_reports_parse_failure() {
        let engine = Engine::default();
        let err = compile_module(&engine, b"(module (func (export").err().unwrap();
        assert!(matches!(err, LoadError::Wat(_)));
    }

    #[test]
    fn invalid_binary_reports_compile_failure() {
        let engine = Engine::default();
        let err = compile_module(&engine, b"\0asm\x02\x00\x00\x00").err().unwrap();
        assert!(matches!(err, LoadError::Compile(_)));
    }
}
