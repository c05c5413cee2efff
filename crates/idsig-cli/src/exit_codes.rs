//! Process exit codes for `idsig`.
//! These codes are part of the public contract; scripts branch on them.

use idsig_verify::{ErrorKind, V4Error};

pub const SUCCESS: i32 = 0;
pub const INTERNAL_ERROR: i32 = 1; // Bad arguments, unreadable files, output failures
pub const NOT_FOUND: i32 = 2; // No v4 signature, or no signer for the requested block
pub const INVALID: i32 = 4; // Signature present but not trustworthy

/// Exit code for a library error.
pub fn for_error(err: &V4Error) -> i32 {
    match err.kind() {
        ErrorKind::NotFound => NOT_FOUND,
        ErrorKind::Security => INVALID,
    }
}

/// Exit code for a command failure, looking through `anyhow` context.
pub fn for_anyhow(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<V4Error>()
        .map_or(INTERNAL_ERROR, for_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_library_contract() {
        let missing = V4Error::SignerBlockNotFound { block_id: 1 };
        assert_eq!(for_error(&missing), NOT_FOUND);
        assert_eq!(for_error(&missing), missing.exit_code());

        let bad = V4Error::PublicKeyMismatch;
        assert_eq!(for_error(&bad), INVALID);
        assert_eq!(for_error(&bad), bad.exit_code());
    }

    #[test]
    fn test_anyhow_downcast() {
        let err = anyhow::Error::new(V4Error::UnsupportedVersion { version: 9 })
            .context("verifying base.apk");
        assert_eq!(for_anyhow(&err), INVALID);
        assert_eq!(for_anyhow(&anyhow::anyhow!("disk on fire")), INTERNAL_ERROR);
    }
}
