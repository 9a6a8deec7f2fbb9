//! JavaScript execution operations for CDP page session.

use serde_json::{Value, json};

use crate::cdp::error::CdpError;
use crate::cdp::protocol::ExceptionDetails;

use super::core::PageSession;

impl PageSession {
    /// Evaluate a JavaScript expression and return its JSON value.
    ///
    /// Promises are awaited. A thrown exception becomes [`CdpError::JavaScript`].
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let message = serde_json::from_value::<ExceptionDetails>(exception.clone())
                .map(|d| d.message())
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CdpError::JavaScript(message));
        }

        Ok(result["result"]["value"].clone())
    }
}
