//! stagecfg wire protocol.
//!
//! Defines the HTTP surface shared by server and client, the validation
//! rules for application and stage identifiers, and the signed token that
//! carries a flat property mapping from server to client.

pub mod descriptor;
pub mod status;
pub mod token;

pub use ed25519_dalek::{SigningKey, VerifyingKey};

pub use descriptor::{validate_identifier, AppDescriptor, ValidationError, ValidationRule};
pub use status::FetchStatus;
pub use token::{
    compute_key_fingerprint, decode_signing_key, decode_token, decode_verifying_key,
    encode_signing_key, encode_verifying_key, generate_keypair, DecodedToken, Properties,
    TokenError, TokenResult, TokenSigner, TOKEN_ALGORITHM, TOKEN_TYPE,
};

/// Path segment under which configuration sets are served.
pub const CONFIG_SEGMENT: &str = "config";

/// Route template for the distribution endpoint.
pub const CONFIG_ROUTE: &str = "/config/{application}";

/// Query parameter selecting the stage override.
pub const STAGE_PARAM: &str = "stage";

/// Route returning the server's base64 verifying key.
pub const KEY_ROUTE: &str = "/key";

/// Liveness route.
pub const HEALTH_ROUTE: &str = "/health";

/// Content type of a token response.
pub const TOKEN_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
