/// Telegram Bot API endpoint and credential sourcing.
/// Token and chat id come from the environment, never from files.
pub struct TelegramConfig {
    pub api_base: &'static str,
    pub token_env: &'static str,
    pub chat_env: &'static str,
    pub send_timeout_ms: u64,
}

pub const TELEGRAM: TelegramConfig = TelegramConfig {
    api_base: "https://api.telegram.org",
    token_env: "TG_TOKEN",
    chat_env: "TG_CHAT",
    send_timeout_ms: 10_000,
};
