// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rust handlers exposed to foreign code as native function pointers.

use crate::value::read_arg;
use crate::{FfiError, ForeignFunction, NativeType, NativeValue, PointerValue};
use libffi::low::ffi_cif;
use libffi::middle::Closure;
use std::ffi::c_void;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, error, warn};

/// Handler invoked for each foreign call of a callback.
pub type CallbackHandler = Box<dyn Fn(&[NativeValue]) -> NativeValue + Send + Sync + 'static>;

struct CallbackState {
    definition: ForeignFunction,
    handler: CallbackHandler,
}

/// Entry point libffi jumps to. Decodes arguments, runs the handler and
/// encodes its result into the return slot.
unsafe extern "C" fn trampoline(
    _cif: &ffi_cif,
    result: &mut u64,
    args: *const *const c_void,
    state: &CallbackState,
) {
    let params = &state.definition.parameters;
    let values: Vec<NativeValue> = params
        .iter()
        .enumerate()
        // SAFETY: libffi passes one pointer per declared parameter.
        .map(|(i, ty)| unsafe { read_arg(*ty, *args.add(i)) })
        .collect();

    let ret = state.definition.result;
    let value = match catch_unwind(AssertUnwindSafe(|| (state.handler)(&values))) {
        Ok(_) if ret == NativeType::Void => NativeValue::Void,
        Ok(value) if value.fits(ret) => value,
        Ok(value) => {
            warn!(
                target: "hostcompat.ffi",
                expected = %ret,
                found = %value.native_type(),
                "callback returned the wrong type, returning zero"
            );
            NativeValue::zero(ret)
        }
        Err(_) => {
            error!(target: "hostcompat.ffi", "callback handler panicked, returning zero");
            NativeValue::zero(ret)
        }
    };
    // SAFETY: libffi sizes the return slot for the declared result, widened
    // to at least `ffi_arg`.
    unsafe { write_result(result as *mut u64 as *mut c_void, value) };
}

/// Store `value` in a closure's return slot.
///
/// Narrow integers are widened to the pointer-sized `ffi_arg`.
unsafe fn write_result(slot: *mut c_void, value: NativeValue) {
    unsafe {
        match value {
            NativeValue::Void => {}
            NativeValue::Bool(v) => *(slot as *mut usize) = usize::from(v),
            NativeValue::U8(v) => *(slot as *mut usize) = v as usize,
            NativeValue::I8(v) => *(slot as *mut isize) = v as isize,
            NativeValue::U16(v) => *(slot as *mut usize) = v as usize,
            NativeValue::I16(v) => *(slot as *mut isize) = v as isize,
            NativeValue::U32(v) => *(slot as *mut usize) = v as usize,
            NativeValue::I32(v) => *(slot as *mut isize) = v as isize,
            NativeValue::U64(v) => *(slot as *mut u64) = v,
            NativeValue::I64(v) => *(slot as *mut i64) = v,
            NativeValue::Usize(v) => *(slot as *mut usize) = v,
            NativeValue::Isize(v) => *(slot as *mut isize) = v,
            NativeValue::F32(v) => *(slot as *mut f32) = v,
            NativeValue::F64(v) => *(slot as *mut f64) = v,
            NativeValue::Pointer(p) => *(slot as *mut usize) = p.address(),
        }
    }
}

/// A Rust handler callable from foreign code through [`pointer`](Self::pointer).
///
/// The handler runs synchronously on whichever thread foreign code calls
/// it from. The handle itself stays with its creator (it is not `Send`).
/// The pointer stays valid until [`close`](Self::close) or drop; calling it
/// afterwards is undefined behaviour.
pub struct UnsafeCallback {
    definition: ForeignFunction,
    pointer: PointerValue,
    closure: Option<Closure<'static>>,
    state: *mut CallbackState,
}

impl UnsafeCallback {
    /// Create a callback with signature `definition` running `handler`.
    pub fn new<F>(definition: ForeignFunction, handler: F) -> Result<Self, FfiError>
    where
        F: Fn(&[NativeValue]) -> NativeValue + Send + Sync + 'static,
    {
        Self::from_boxed(definition, Box::new(handler))
    }

    /// [`new`](Self::new) for an already boxed handler.
    pub fn from_boxed(
        definition: ForeignFunction,
        handler: CallbackHandler,
    ) -> Result<Self, FfiError> {
        definition.validate("callback")?;
        let cif = definition.signature().cif();
        let state = Box::into_raw(Box::new(CallbackState {
            definition: definition.clone(),
            handler,
        }));
        // SAFETY: `state` is freed only in `close`, after the closure.
        let userdata: &'static CallbackState = unsafe { &*state };
        let closure = Closure::new(cif, trampoline, userdata);
        let pointer = PointerValue::from_address(*closure.code_ptr() as usize);
        debug!(target: "hostcompat.ffi", %pointer, "callback created");
        Ok(Self {
            definition,
            pointer,
            closure: Some(closure),
            state,
        })
    }

    /// Native entry point. Pass it where a `function` is expected.
    pub fn pointer(&self) -> PointerValue {
        self.pointer
    }

    /// Declared signature.
    pub fn definition(&self) -> &ForeignFunction {
        &self.definition
    }

    /// `true` after [`close`](Self::close).
    pub fn is_closed(&self) -> bool {
        self.closure.is_none()
    }

    /// Release the native entry point and the handler. Idempotent.
    pub fn close(&mut self) {
        if let Some(closure) = self.closure.take() {
            drop(closure);
            // SAFETY: created by `Box::into_raw` in `from_boxed`; the closure
            // referencing it is gone.
            drop(unsafe { Box::from_raw(self.state) });
            self.state = std::ptr::null_mut();
            debug!(target: "hostcompat.ffi", pointer = %self.pointer, "callback closed");
        }
    }
}

impl Drop for UnsafeCallback {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for UnsafeCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnsafeCallback")
            .field("definition", &self.definition)
            .field("pointer", &self.pointer)
            .field("closed", &self.is_closed())
            .finish()
    }
}
