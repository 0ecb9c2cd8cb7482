//! XML documents exchanged with the gateway

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Deserialize;

use crate::error::{GatewayError, GatewayResult};
use crate::payments::types::ParameterSet;

pub const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

const ROOT_ELEMENT: &str = "response";

/// Answer of `init_payment.php`.
#[derive(Debug, Clone, Deserialize)]
pub struct InitPaymentReply {
    pub pg_status: String,
    #[serde(default)]
    pub pg_payment_id: Option<String>,
    #[serde(default)]
    pub pg_redirect_url: Option<String>,
    #[serde(default)]
    pub pg_error_code: Option<String>,
    #[serde(default)]
    pub pg_error_description: Option<String>,
}

impl InitPaymentReply {
    pub fn parse(body: &str) -> GatewayResult<Self> {
        quick_xml::de::from_str(body).map_err(|e| {
            GatewayError::unavailable(Some(200), format!("Malformed gateway response: {}", e))
        })
    }

    pub fn is_ok(&self) -> bool {
        self.pg_status.trim() == "ok"
    }

    /// Numeric error code; missing or non-numeric codes read as 0.
    pub fn error_code(&self) -> u32 {
        self.pg_error_code
            .as_deref()
            .and_then(|c| c.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// Renders `<response>` with one child element per non-empty parameter.
pub fn render_response(params: &ParameterSet) -> GatewayResult<String> {
    let mut writer = Writer::new(Vec::new());

    write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    write(&mut writer, Event::Start(BytesStart::new(ROOT_ELEMENT)))?;
    for (key, value) in params.to_wire_pairs() {
        write(&mut writer, Event::Start(BytesStart::new(key.as_str())))?;
        write(&mut writer, Event::Text(BytesText::new(&value)))?;
        write(&mut writer, Event::End(BytesEnd::new(key.as_str())))?;
    }
    write(&mut writer, Event::End(BytesEnd::new(ROOT_ELEMENT)))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| GatewayError::processing(format!("Response is not valid UTF-8: {}", e)))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> GatewayResult<()> {
    writer
        .write_event(event)
        .map_err(|e| GatewayError::processing(format!("Failed to write XML response: {}", e)))
}
