// SPDX-License-Identifier: MIT OR Apache-2.0
//! Symbol definitions as passed to `dlopen`.

use crate::{FfiError, HostSignature, NativeType};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Declared signature of a foreign function or callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignFunction {
    /// Parameter tags, in order.
    pub parameters: Vec<NativeType>,
    /// Result tag.
    pub result: NativeType,
    /// Accepted for compatibility. Calls always run on the calling thread.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nonblocking: bool,
}

impl ForeignFunction {
    /// Signature with the given parameters and result.
    pub fn new(parameters: impl IntoIterator<Item = NativeType>, result: NativeType) -> Self {
        Self {
            parameters: parameters.into_iter().collect(),
            result,
            nonblocking: false,
        }
    }

    /// Reject signatures the host cannot bind. `void` is only a result.
    pub fn validate(&self, symbol: &str) -> Result<(), FfiError> {
        if let Some(index) = self.parameters.iter().position(|t| *t == NativeType::Void) {
            return Err(FfiError::InvalidSignature {
                symbol: symbol.to_string(),
                reason: format!("parameter {index} is void"),
            });
        }
        Ok(())
    }

    /// Translate every tag into the host vocabulary.
    pub fn signature(&self) -> HostSignature {
        HostSignature {
            parameters: self.parameters.iter().map(|t| t.host_type()).collect(),
            result: self.result.host_type(),
        }
    }
}

/// One entry of a symbol map.
///
/// Deserializes `{ "type": ... }` as [`Native`](Self::Native) regardless of
/// the value, so it can be rejected by name before anything is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SymbolDefinition {
    /// Non-portable native-type shorthand. Never bindable.
    Native {
        /// The raw `type` value, as JSON text.
        #[serde(rename = "type")]
        notation: String,
    },
    /// A `{ parameters, result }` function definition.
    Function(ForeignFunction),
}

impl<'de> Deserialize<'de> for SymbolDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        if let Some(notation) = value.get("type") {
            return Ok(Self::Native {
                notation: notation.to_string(),
            });
        }
        ForeignFunction::deserialize(value)
            .map(Self::Function)
            .map_err(D::Error::custom)
    }
}

impl From<ForeignFunction> for SymbolDefinition {
    fn from(value: ForeignFunction) -> Self {
        Self::Function(value)
    }
}

/// Symbol name to definition, iterated in name order.
pub type SymbolMap = BTreeMap<String, SymbolDefinition>;

/// Parse a JSON object of symbol definitions.
pub fn parse_symbols(json: &str) -> Result<SymbolMap, FfiError> {
    serde_json::from_str(json).map_err(FfiError::InvalidSymbols)
}
