//! Message catalog for user-facing notices.

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    ZhCn,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "en" | "en-us" | "en-gb" => Ok(Self::En),
            "zh" | "zh-cn" | "zh-hans" => Ok(Self::ZhCn),
            other => Err(format!("unsupported locale: {}", other)),
        }
    }
}

impl Locale {
    pub fn tag(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::ZhCn => "zh-CN",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Translator {
    locale: Locale,
}

impl Translator {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Unknown keys come back unchanged.
    pub fn translate<'a>(&self, key: &'a str) -> &'a str {
        lookup(self.locale, key).unwrap_or(key)
    }
}

fn lookup(locale: Locale, key: &str) -> Option<&'static str> {
    let message = match (locale, key) {
        (Locale::En, "users.save_failed") => "Save failed!",
        (Locale::En, "users.updated_password") => "Password updated.",
        (Locale::ZhCn, "users.save_failed") => "保存失败！",
        (Locale::ZhCn, "users.updated_password") => "密码已更新。",
        _ => return None,
    };
    Some(message)
}
