// SPDX-License-Identifier: MIT OR Apache-2.0
//! Opening dynamic libraries and calling their functions.

use crate::value::ArgSlot;
use crate::{
    FfiError, ForeignFunction, HostSignature, NativeType, NativeValue, PointerValue,
    SymbolDefinition, SymbolMap,
};
use libffi::middle::{Arg, Cif, CodePtr};
use libloading::Library;
use std::collections::BTreeMap;
use std::ffi::c_void;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A code address bound to a prepared call interface.
struct PreparedCall {
    definition: ForeignFunction,
    signature: HostSignature,
    cif: Cif,
    code: CodePtr,
}

impl PreparedCall {
    fn new(definition: ForeignFunction, code: *mut c_void) -> Self {
        let signature = definition.signature();
        let cif = signature.cif();
        Self {
            definition,
            signature,
            cif,
            code: CodePtr::from_ptr(code),
        }
    }

    unsafe fn call(&self, name: &str, args: &[NativeValue]) -> Result<NativeValue, FfiError> {
        let params = &self.definition.parameters;
        if args.len() != params.len() {
            return Err(FfiError::ArityMismatch {
                symbol: name.to_string(),
                expected: params.len(),
                found: args.len(),
            });
        }
        let slots = params
            .iter()
            .zip(args)
            .enumerate()
            .map(|(index, (ty, value))| {
                ArgSlot::new(*ty, value).ok_or_else(|| FfiError::TypeMismatch {
                    symbol: name.to_string(),
                    index,
                    expected: *ty,
                    found: value.native_type(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let ffi_args: Vec<Arg> = slots.iter().map(ArgSlot::as_arg).collect();
        Ok(unsafe { invoke(&self.cif, self.code, self.definition.result, &ffi_args) })
    }
}

/// Call through `cif` and read the result as `result`.
///
/// Integer results narrower than a register come back widened to `ffi_arg`,
/// which is pointer-sized on every supported target.
unsafe fn invoke(cif: &Cif, code: CodePtr, result: NativeType, args: &[Arg]) -> NativeValue {
    unsafe {
        match result {
            NativeType::Void => {
                cif.call::<()>(code, args);
                NativeValue::Void
            }
            NativeType::Bool => NativeValue::Bool(cif.call::<usize>(code, args) as u8 != 0),
            NativeType::U8 => NativeValue::U8(cif.call::<usize>(code, args) as u8),
            NativeType::I8 => NativeValue::I8(cif.call::<usize>(code, args) as i8),
            NativeType::U16 => NativeValue::U16(cif.call::<usize>(code, args) as u16),
            NativeType::I16 => NativeValue::I16(cif.call::<usize>(code, args) as i16),
            NativeType::U32 => NativeValue::U32(cif.call::<usize>(code, args) as u32),
            NativeType::I32 => NativeValue::I32(cif.call::<usize>(code, args) as i32),
            NativeType::U64 => NativeValue::U64(cif.call::<u64>(code, args)),
            NativeType::I64 => NativeValue::I64(cif.call::<i64>(code, args)),
            NativeType::Usize => NativeValue::Usize(cif.call::<usize>(code, args)),
            NativeType::Isize => NativeValue::Isize(cif.call::<isize>(code, args)),
            NativeType::F32 => NativeValue::F32(cif.call::<f32>(code, args)),
            NativeType::F64 => NativeValue::F64(cif.call::<f64>(code, args)),
            NativeType::Pointer | NativeType::Buffer | NativeType::Function => {
                NativeValue::Pointer(PointerValue::from_raw(
                    cif.call::<*const c_void>(code, args),
                ))
            }
        }
    }
}

/// One bound function of a [`DynamicLibrary`].
pub struct ForeignSymbol {
    name: String,
    call: PreparedCall,
}

impl ForeignSymbol {
    /// Symbol name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared signature.
    pub fn definition(&self) -> &ForeignFunction {
        &self.call.definition
    }

    /// Translated signature.
    pub fn signature(&self) -> &HostSignature {
        &self.call.signature
    }

    /// Resolved code address.
    pub fn address(&self) -> PointerValue {
        PointerValue::from_raw(self.call.code.as_ptr())
    }

    /// Call the function.
    ///
    /// Arity and argument types are checked against the declaration before
    /// anything is called.
    ///
    /// # Safety
    ///
    /// The declaration must match the native function, and every address
    /// argument must be valid for what the function does with it.
    pub unsafe fn call(&self, args: &[NativeValue]) -> Result<NativeValue, FfiError> {
        unsafe { self.call.call(&self.name, args) }
    }
}

impl fmt::Debug for ForeignSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignSymbol")
            .field("name", &self.name)
            .field("definition", &self.call.definition)
            .field("address", &self.address())
            .finish()
    }
}

/// A function pointer obtained at runtime, typically from a callback or a
/// foreign call's result.
pub struct UnsafeFnPointer {
    pointer: PointerValue,
    call: PreparedCall,
}

impl UnsafeFnPointer {
    /// Bind `pointer` to `definition`.
    pub fn new(pointer: PointerValue, definition: ForeignFunction) -> Result<Self, FfiError> {
        if pointer.is_null() {
            return Err(FfiError::NullPointer);
        }
        definition.validate(&pointer.to_string())?;
        Ok(Self {
            pointer,
            call: PreparedCall::new(definition, pointer.as_mut_ptr()),
        })
    }

    /// The bound address.
    pub fn pointer(&self) -> PointerValue {
        self.pointer
    }

    /// Declared signature.
    pub fn definition(&self) -> &ForeignFunction {
        &self.call.definition
    }

    /// Call through the pointer.
    ///
    /// # Safety
    ///
    /// Same contract as [`ForeignSymbol::call`]; additionally the address
    /// must still point at live code.
    pub unsafe fn call(&self, args: &[NativeValue]) -> Result<NativeValue, FfiError> {
        unsafe { self.call.call(&self.pointer.to_string(), args) }
    }
}

impl fmt::Debug for UnsafeFnPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnsafeFnPointer")
            .field("pointer", &self.pointer)
            .field("definition", &self.call.definition)
            .finish()
    }
}

/// An opened library and its bound symbols.
///
/// Symbols are dropped before the library is unloaded.
pub struct DynamicLibrary {
    path: PathBuf,
    symbols: BTreeMap<String, ForeignSymbol>,
    library: Library,
}

impl DynamicLibrary {
    /// Path the library was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bound symbol by name.
    pub fn symbol(&self, name: &str) -> Result<&ForeignSymbol, FfiError> {
        self.symbols.get(name).ok_or_else(|| FfiError::UnknownSymbol {
            symbol: name.to_string(),
        })
    }

    /// All bound symbols in name order.
    pub fn symbols(&self) -> impl Iterator<Item = &ForeignSymbol> {
        self.symbols.values()
    }

    /// Call the named symbol.
    ///
    /// # Safety
    ///
    /// See [`ForeignSymbol::call`].
    pub unsafe fn call(&self, name: &str, args: &[NativeValue]) -> Result<NativeValue, FfiError> {
        let symbol = self.symbol(name)?;
        unsafe { symbol.call(args) }
    }

    /// Unload the library.
    pub fn close(self) -> Result<(), FfiError> {
        let Self {
            path,
            symbols,
            library,
        } = self;
        drop(symbols);
        library.close().map_err(|source| FfiError::Open {
            path: path.display().to_string(),
            source,
        })?;
        debug!(target: "hostcompat.ffi", path = %path.display(), "library closed");
        Ok(())
    }
}

impl fmt::Debug for DynamicLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicLibrary")
            .field("path", &self.path)
            .field("symbols", &self.symbols.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Validate every definition and translate it, without touching the library.
fn binding_table(symbols: &SymbolMap) -> Result<Vec<(&str, &ForeignFunction)>, FfiError> {
    symbols
        .iter()
        .map(|(name, definition)| match definition {
            SymbolDefinition::Native { .. } => Err(FfiError::NativeNotation {
                symbol: name.clone(),
            }),
            SymbolDefinition::Function(function) => {
                function.validate(name)?;
                Ok((name.as_str(), function))
            }
        })
        .collect()
}

/// Open the library at `path` and bind every symbol in `symbols`.
///
/// Definitions are checked before the library is opened: a `{ "type": ... }`
/// entry fails with [`FfiError::NativeNotation`] naming the symbol and the
/// library is never loaded.
pub fn dlopen(path: impl AsRef<Path>, symbols: &SymbolMap) -> Result<DynamicLibrary, FfiError> {
    let path = path.as_ref();
    let table = binding_table(symbols)?;

    // SAFETY: loading runs the library's initialisers; the caller chose it.
    let library = unsafe { Library::new(path) }.map_err(|source| {
        warn!(target: "hostcompat.ffi", path = %path.display(), "dlopen failed: {source}");
        FfiError::Open {
            path: path.display().to_string(),
            source,
        }
    })?;

    let mut bound = BTreeMap::new();
    for (name, definition) in table {
        // SAFETY: the address is only used through a cif built from the
        // caller's declaration.
        let address = unsafe { library.get::<*mut c_void>(name.as_bytes()) }
            .map(|symbol| *symbol)
            .map_err(|source| FfiError::MissingSymbol {
                symbol: name.to_string(),
                source,
            })?;
        bound.insert(
            name.to_string(),
            ForeignSymbol {
                name: name.to_string(),
                call: PreparedCall::new(definition.clone(), address),
            },
        );
    }

    debug!(
        target: "hostcompat.ffi",
        path = %path.display(),
        symbols = bound.len(),
        "library opened"
    );
    Ok(DynamicLibrary {
        path: path.to_path_buf(),
        symbols: bound,
        library,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_notation_fails_before_open() {
        let symbols = crate::parse_symbols(
            r#"{
                "add": { "parameters": ["i32", "i32"], "result": "i32" },
                "counter": { "type": "u64" }
            }"#,
        )
        .unwrap();
        let err = dlopen("/definitely/not/a/library.so", &symbols).unwrap_err();
        match err {
            FfiError::NativeNotation { symbol } => assert_eq!(symbol, "counter"),
            other => panic!("expected NativeNotation, got {other:?}"),
        }
    }

    #[test]
    fn void_parameter_fails_before_open() {
        let mut symbols = SymbolMap::new();
        symbols.insert(
            "f".into(),
            ForeignFunction::new([NativeType::Void], NativeType::Void).into(),
        );
        assert!(matches!(
            dlopen("/definitely/not/a/library.so", &symbols),
            Err(FfiError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn missing_library_is_an_open_error() {
        let err = dlopen("/definitely/not/a/library.so", &SymbolMap::new()).unwrap_err();
        assert!(matches!(err, FfiError::Open { .. }));
        assert_eq!(err.code(), hc_error::ErrorCode::FfiLibraryOpen);
    }

    #[test]
    fn null_fn_pointer_is_rejected() {
        let def = ForeignFunction::new([], NativeType::Void);
        assert!(matches!(
            UnsafeFnPointer::new(PointerValue::NULL, def),
            Err(FfiError::NullPointer)
        ));
    }
}
