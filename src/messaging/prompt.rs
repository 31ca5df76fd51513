//! Prompt rendering for collection messages.
//!
//! Rendering is a pure function of `(record, tone)`: the same inputs always
//! produce byte-identical text, and two tones differ only in the tone
//! fragment.

use crate::records::CustomerRecord;

use super::tone::Tone;

/// Store identity the messages are sent on behalf of.
pub const SENDER: &str = "SUPERMODA DIAS DAVILA";

/// Payment channel quoted in every message.
pub const PAYMENT_CHANNEL: &str = "PIX";

/// Phrase the model must never use.
pub const FORBIDDEN_PHRASE: &str = "caso já tenha pago, desconsidere";

/// Format an amount with two decimals and a comma separator (`1234.5` → `1234,50`).
///
/// No thousands grouping is applied.
pub fn format_amount(amount: f64) -> String {
    format!("{amount:.2}").replace('.', ",")
}

/// Render the prompt for one record in the given tone.
pub fn render(record: &CustomerRecord, tone: Tone) -> String {
    let amount = format_amount(record.total_due);
    format!(
        "Você é o responsável pelo setor de cobrança da loja {SENDER}.\n\
         Sua tarefa é gerar uma mensagem de cobrança para WhatsApp eficiente.\n\
         \n\
         ESTILO DA MENSAGEM: {instruction}\n\
         \n\
         Dados do cliente:\n\
         - Nome do Cliente: {name}\n\
         - Modalidade de Compra: CREDIÁRIO PRÓPRIO (SUPERMODA)\n\
         - Quantidade de Parcelas Pendentes: {installments}\n\
         - Total de dias em atraso: {days_late}\n\
         - Valor Total Atualizado para quitação: R$ {amount}\n\
         - Chave de Pagamento: {PAYMENT_CHANNEL}\n\
         \n\
         Regras Gerais:\n\
         1. Identifique-se como sendo da {SENDER}.\n\
         2. Informe o valor de R$ {amount} como o valor total para quitação.\n\
         3. Solicite o pagamento via {PAYMENT_CHANNEL}.\n\
         4. Reforce que manter o crediário em dia garante crédito futuro.\n\
         5. NÃO use a frase \"{FORBIDDEN_PHRASE}\".\n\
         6. A mensagem deve ser curta, limpa e profissional.\n\
         7. Use emojis de forma moderada e compatível com o tom escolhido.\n",
        instruction = tone.instruction(),
        name = record.name,
        installments = record.installments_pending,
        days_late = record.days_late,
    )
}
