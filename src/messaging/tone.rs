//! Message tones and their instruction fragments.

use serde::Serialize;

/// Style variant controlling the wording register of generated messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    /// Gentle reminder opening with a well-being check.
    Friendly,
    /// Direct and professional.
    #[default]
    Standard,
    /// Stresses credit-limit impact and account suspension.
    Urgent,
    /// Invites the customer to negotiate a payment arrangement.
    Negotiation,
}

impl Tone {
    /// All tones, in menu order.
    pub const ALL: [Tone; 4] = [Self::Friendly, Self::Standard, Self::Urgent, Self::Negotiation];

    /// Stable identifier used on the command line and in JSON output.
    pub fn id(self) -> &'static str {
        match self {
            Self::Friendly => "friendly",
            Self::Standard => "standard",
            Self::Urgent => "urgent",
            Self::Negotiation => "negotiation",
        }
    }

    /// Operator-facing label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Friendly => "😊 Lembrete Amigável",
            Self::Standard => "📢 Cobrança Padrão",
            Self::Urgent => "⚠️ Aviso Urgente",
            Self::Negotiation => "🤝 Proposta de Acordo",
        }
    }

    /// Fixed instruction fragment injected into the prompt.
    pub fn instruction(self) -> &'static str {
        match self {
            Self::Friendly => {
                "TOM CORDIAL/AMIGÁVEL: Use um tom de lembrete gentil. Comece perguntando se está \
                 tudo bem. Diga que notamos uma pequena pendência e gostaríamos de ajudar a regularizar."
            }
            Self::Standard => {
                "TOM ASSERTIVO/DIRETO: Seja profissional, direto e foque na quitação. Sem rodeios, \
                 mas com educação."
            }
            Self::Urgent => {
                "TOM URGENTE/SÉRIO: Use um tom de urgência. Mencione que o atraso prolongado pode \
                 afetar o limite de crédito e levar à suspensão do cadastro no crediário próprio."
            }
            Self::Negotiation => {
                "TOM DE NEGOCIAÇÃO: Convide o cliente a vir à loja para conversar ou propor um \
                 acordo. Mostre que a SUPERMODA valoriza a parceria e quer encontrar uma solução."
            }
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Lenient parse: accepts English ids and the store's Portuguese ids,
/// case-insensitively. Anything else is [`Tone::Standard`].
impl From<&str> for Tone {
    fn from(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "friendly" | "cordial" => Self::Friendly,
            "urgent" | "urgente" => Self::Urgent,
            "negotiation" | "negociacao" | "negociação" => Self::Negotiation,
            _ => Self::Standard,
        }
    }
}
