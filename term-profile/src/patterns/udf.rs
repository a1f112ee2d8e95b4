//! DataFusion scalar functions computing value signatures.
//!
//! Both functions accept a single argument of any type. The argument is cast to
//! its string representation first, so integer, date and decimal columns get a
//! signature of their textual rendering. Nulls stay null.

use std::any::Any;
use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use datafusion::common::cast::as_string_array;
use datafusion::common::{exec_err, ScalarValue};
use datafusion::error::Result as DFResult;
use datafusion::logical_expr::{
    ColumnarValue, ScalarFunctionArgs, ScalarUDF, ScalarUDFImpl, Signature, Volatility,
};
use datafusion::prelude::SessionContext;

use super::PatternVariant;

/// SQL name of the stored-variant signature function.
pub const PATTERN_SIGNATURE_FUNCTION: &str = "pattern_signature";

/// SQL name of the strict-variant signature function.
pub const STRICT_PATTERN_SIGNATURE_FUNCTION: &str = "strict_pattern_signature";

/// Scalar UDF folding values into signatures of one [`PatternVariant`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct PatternSignatureUdf {
    variant: PatternVariant,
    signature: Signature,
}

impl PatternSignatureUdf {
    /// Creates the function for the given variant.
    pub fn new(variant: PatternVariant) -> Self {
        Self {
            variant,
            signature: Signature::any(1, Volatility::Immutable),
        }
    }

    /// Returns the variant this function computes.
    pub fn variant(&self) -> PatternVariant {
        self.variant
    }

    fn fold_array(&self, input: &ArrayRef) -> DFResult<ArrayRef> {
        let text = cast(input, &DataType::Utf8)?;
        let text = as_string_array(&text)?;
        let folded: StringArray = text
            .iter()
            .map(|value| value.map(|value| self.variant.apply(value)))
            .collect();
        Ok(Arc::new(folded))
    }
}

impl ScalarUDFImpl for PatternSignatureUdf {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> &str {
        self.variant.function_name()
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn return_type(&self, _arg_types: &[DataType]) -> DFResult<DataType> {
        Ok(DataType::Utf8)
    }

    fn invoke_with_args(&self, args: ScalarFunctionArgs) -> DFResult<ColumnarValue> {
        let Some(input) = args.args.first() else {
            return exec_err!("{} expects exactly one argument", self.name());
        };

        match input {
            ColumnarValue::Array(array) => Ok(ColumnarValue::Array(self.fold_array(array)?)),
            ColumnarValue::Scalar(scalar) => {
                let folded = self.fold_array(&scalar.to_array()?)?;
                Ok(ColumnarValue::Scalar(ScalarValue::try_from_array(
                    &folded, 0,
                )?))
            }
        }
    }
}

/// Registers `pattern_signature` and `strict_pattern_signature` on a session.
pub fn register_pattern_functions(ctx: &SessionContext) {
    ctx.register_udf(ScalarUDF::new_from_impl(PatternSignatureUdf::new(
        PatternVariant::Stored,
    )));
    ctx.register_udf(ScalarUDF::new_from_impl(PatternSignatureUdf::new(
        PatternVariant::Strict,
    )));
}
