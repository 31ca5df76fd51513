//! WhatsApp click-to-chat links.

use dunning::messaging::handoff::whatsapp_link;

#[test]
fn link_targets_digits_and_encodes_text() {
    let link = whatsapp_link("5571999990000", "Olá Maria!\nValor: R$ 105,00");

    assert_eq!(
        link.as_deref(),
        Some("https://wa.me/5571999990000?text=Ol%C3%A1%20Maria!%0AValor%3A%20R%24%20105%2C00")
    );
}

#[test]
fn phone_punctuation_is_stripped() {
    let link = whatsapp_link("+55 (71) 99999-0000", "oi").unwrap_or_default();
    assert!(link.starts_with("https://wa.me/5571999990000?text="));
}

#[test]
fn unreserved_marks_stay_literal() {
    let link = whatsapp_link("71", "a-b_c.d~e*f'g(h)").unwrap_or_default();
    assert!(link.ends_with("?text=a-b_c.d~e*f'g(h)"));
}

#[test]
fn emoji_is_percent_encoded_as_utf8() {
    let link = whatsapp_link("71", "😊").unwrap_or_default();
    assert!(link.ends_with("?text=%F0%9F%98%8A"));
}

#[test]
fn missing_phone_yields_no_link() {
    assert!(whatsapp_link("", "oi").is_none());
    assert!(whatsapp_link("sem telefone", "oi").is_none());
}
