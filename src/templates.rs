//! Localized reply templates
//!
//! Every user-visible string lives here, one complete set per language.
//! Placeholders use `{name}` syntax and are filled in by [`render`].

use crate::models::Language;

/// Full set of templates for one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateSet {
    pub price_header: &'static str,
    pub price_line: &'static str,
    pub price_not_found: &'static str,
    pub price_api_error: &'static str,
    pub price_parse_error: &'static str,
    pub search_no_results: &'static str,
    pub search_api_error: &'static str,
    pub synth_prompt: &'static str,
    pub synth_api_error: &'static str,
    pub synth_service_unavailable: &'static str,
    pub synth_sources_header: &'static str,
}

static EN: TemplateSet = TemplateSet {
    price_header: "Current prices for {symbol} (Source: Wallex.ir at {timestamp}):",
    price_line: "• {quote} ({symbol}): {price}",
    price_not_found: "Sorry, I couldn't find any markets for the symbol {symbol} on Wallex.ir.",
    price_api_error: "Sorry, I had trouble connecting to the Wallex.ir API. Please try again later.",
    price_parse_error: "Sorry, I had trouble understanding the response from the price API.",
    search_no_results: "Sorry, I couldn't find any web results for that query.",
    search_api_error: "Sorry, I had trouble connecting to the web search API. (Error: {e})",
    synth_prompt: "You are a cryptocurrency research assistant. Answer the user's question based *only* on the provided search results. Do not use any prior knowledge. Be concise and helpful. You MUST answer in English.",
    synth_api_error: "Sorry, I had trouble generating an answer from the search results.",
    synth_service_unavailable: "Sorry, the text synthesis service is not available.",
    synth_sources_header: "\n\nSources:\n",
};

static FA: TemplateSet = TemplateSet {
    price_header: "قیمت‌های فعلی برای {symbol} (منبع: Wallex.ir در {timestamp}):",
    price_line: "• {quote} ({symbol}): {price}",
    price_not_found: "متاسفانه، هیچ بازاری برای نماد {symbol} در Wallex.ir پیدا نشد.",
    price_api_error: "متاسفانه، در اتصال به API Wallex.ir مشکلی پیش آمد. لطفا بعدا تلاش کنید.",
    price_parse_error: "متاسفانه، در درک پاسخ API قیمت مشکلی وجود داشت.",
    search_no_results: "متاسفانه، هیچ نتیجه‌ای در وب برای این پرسش پیدا نکردم.",
    search_api_error: "متاسفانه، در اتصال به API جستجوی وب مشکلی پیش آمد. (خطا: {e})",
    synth_prompt: "شما یک دستیار تحقیق ارز دیجیتال هستید. *فقط* بر اساس نتایج جستجوی ارائه‌شده، به سوال کاربر پاسخ دهید. از هیچ دانش قبلی استفاده نکنید. مختصر و مفید باشید. شما *باید* به زبان فارسی پاسخ دهید.",
    synth_api_error: "متاسفانه، در تولید پاسخ از نتایج جستجو مشکلی پیش آمد.",
    synth_service_unavailable: "متاسفانه، سرویس تولید متن در دسترس نیست.",
    synth_sources_header: "\n\nمنابع:\n",
};

/// Welcome text shown by interactive hosts.
pub const WELCOME: &str = "Hi! I'm your Crypto Chatbot.\n\n\
Ask me for a coin price (e.g., 'price of BTC') or a research question (e.g., 'what is solana?').\n\n\
می‌توانید فارسی هم بپرسید (مثلا: «قیمت بیت کوین» یا «سولانا چیست؟»)";

/// Generic reply used when reply generation itself blew up.
pub const UNEXPECTED_ERROR: &str =
    "Sorry, an unexpected error occurred. I've notified the developers.";

pub fn templates(language: Language) -> &'static TemplateSet {
    match language {
        Language::En => &EN,
        Language::Fa => &FA,
    }
}

/// Look up templates by raw tag; unknown tags get English.
pub fn templates_for_tag(tag: &str) -> &'static TemplateSet {
    templates(Language::from_tag(tag).unwrap_or_default())
}

/// Substitute `{name}` placeholders. Unknown placeholders are left as-is.
///
/// Substitution is a single pass over `template`; inserted values are never
/// scanned for placeholders themselves.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after[..close];
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
