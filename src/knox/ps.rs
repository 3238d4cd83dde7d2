mod blind_signature;
mod issuer;
mod public_key;
mod secret_key;
mod signature;

pub use blind_signature::*;
pub use issuer::*;
pub use public_key::*;
pub use secret_key::*;
pub use signature::*;
