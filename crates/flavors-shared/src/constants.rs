/// Application name
pub const APP_NAME: &str = "Festival Flavors";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Maximum upload size in bytes for a single submission (50 MiB)
pub const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

/// Key derivation context for password digests (BLAKE3)
pub const KDF_CONTEXT_PASSWORD: &str = "festival-flavors-password-v1";

/// Random salt size in bytes
pub const SALT_SIZE: usize = 16;

/// Default number of BLAKE3 rounds applied to a password
pub const PASSWORD_HASH_ROUNDS: u32 = 10_000;

/// Language recorded for recipes submitted through the voice flow
pub const VOICE_LANGUAGE: &str = "Voice";

/// Ingredients placeholder for recipes submitted through the voice flow
pub const VOICE_INGREDIENTS: &str = "(submitted via voice)";

/// Transcript returned when the audio held no recognisable speech
pub const TRANSCRIPT_UNINTELLIGIBLE: &str = "[Could not understand audio]";

/// Transcript returned when the speech service could not be reached
pub const TRANSCRIPT_UNAVAILABLE: &str = "[Speech service unavailable]";
