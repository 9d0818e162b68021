//! Localized error messages.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Locale used when resolving error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    PtBr,
    EnUs,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::PtBr => "pt_BR",
            Locale::EnUs => "en_US",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.replace('-', "_").to_ascii_lowercase().as_str() {
            "pt_br" | "pt" => Ok(Locale::PtBr),
            "en_us" | "en" => Ok(Locale::EnUs),
            other => Err(Error::Configuration(format!("unsupported locale: {other}"))),
        }
    }
}

/// Message catalogue keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    ServiceUnavailable,
    NotFound,
    Unauthorized,
    UnprocessableEntity,
    UnexpectedError,
    InternalServerError,
}

/// Resolve `key` for `locale`.
pub fn message(key: MessageKey, locale: Locale) -> &'static str {
    match (locale, key) {
        (Locale::PtBr, MessageKey::ServiceUnavailable) => {
            "O OZmap está indisponível no momento. Verifique a URL configurada e tente novamente em alguns minutos."
        }
        (Locale::PtBr, MessageKey::NotFound) => {
            "O recurso solicitado não foi encontrado no OZmap. Confira o identificador informado."
        }
        (Locale::PtBr, MessageKey::Unauthorized) => {
            "A chave de acesso ao OZmap é inválida ou expirou. Autentique-se novamente."
        }
        (Locale::PtBr, MessageKey::UnprocessableEntity) => {
            "O OZmap recusou os dados enviados. Revise os campos da requisição."
        }
        (Locale::PtBr, MessageKey::UnexpectedError) => {
            "O OZmap retornou uma resposta inesperada. Revise a requisição e contate o suporte se persistir."
        }
        (Locale::PtBr, MessageKey::InternalServerError) => {
            "Ocorreu um erro interno no OZmap. Tente novamente mais tarde."
        }
        (Locale::EnUs, MessageKey::ServiceUnavailable) => {
            "OZmap is currently unavailable. Check the configured URL and try again in a few minutes."
        }
        (Locale::EnUs, MessageKey::NotFound) => {
            "The requested resource was not found in OZmap. Check the identifier you sent."
        }
        (Locale::EnUs, MessageKey::Unauthorized) => {
            "The OZmap access key is invalid or expired. Authenticate again."
        }
        (Locale::EnUs, MessageKey::UnprocessableEntity) => {
            "OZmap rejected the submitted data. Review the request fields."
        }
        (Locale::EnUs, MessageKey::UnexpectedError) => {
            "OZmap returned an unexpected response. Review the request and contact support if it persists."
        }
        (Locale::EnUs, MessageKey::InternalServerError) => {
            "OZmap hit an internal error. Try again later."
        }
    }
}
