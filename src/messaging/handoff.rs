//! Manual hand-off of generated messages to WhatsApp.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left unescaped by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const WHATSAPP_BASE: &str = "https://wa.me/";

/// Build a `wa.me` click-to-chat link pre-filled with `message`.
///
/// Returns `None` when the phone number has no digits; a link without a
/// recipient would open WhatsApp's contact picker instead of the chat.
pub fn whatsapp_link(phone: &str, message: &str) -> Option<String> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    let text = utf8_percent_encode(message, URI_COMPONENT);
    Some(format!("{WHATSAPP_BASE}{digits}?text={text}"))
}
