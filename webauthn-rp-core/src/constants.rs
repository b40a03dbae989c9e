// Can this ever change?
pub const CHALLENGE_SIZE_BYTES: usize = 32;
// The smallest caller supplied challenge that is accepted.
pub const MIN_CHALLENGE_SIZE_BYTES: usize = 16;
// Milliseconds
pub const DEFAULT_AUTHENTICATOR_TIMEOUT: u32 = 60000;

// How far in the future a safetynet timestamp may be.
pub const SAFETYNET_CLOCK_SKEW_MS: u128 = 60_000;
pub const DEFAULT_SAFETYNET_FRESHNESS_MS: u128 = 60_000;
pub const SAFETYNET_HOSTNAME: &str = "attest.android.com";

pub const CREDENTIAL_TYPE_PUBLIC_KEY: &str = "public-key";
pub const CLIENT_DATA_TYPE_CREATE: &str = "webauthn.create";
pub const CLIENT_DATA_TYPE_GET: &str = "webauthn.get";

pub const TOKEN_BINDING_STATUSES: [&str; 3] = ["present", "supported", "not-supported"];

// The header of an apple nonce extension: SEQUENCE { [1] { OCTET STRING (32) } }
pub const APPLE_NONCE_PREFIX: [u8; 6] = [0x30, 0x24, 0xa1, 0x22, 0x04, 0x20];
