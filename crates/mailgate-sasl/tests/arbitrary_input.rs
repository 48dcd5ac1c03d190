//! Decoders must reject garbage with an error, never a panic.

use mailgate_sasl::{OAuthBearerOptions, PlainCredentials};
use proptest::prelude::*;

proptest! {
    #[test]
    fn plain_never_panics(raw in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = PlainCredentials::from_bytes(&raw);
    }

    #[test]
    fn oauthbearer_never_panics(msg in "\\PC*") {
        let _ = OAuthBearerOptions::parse(&msg);
    }

    #[test]
    fn oauthbearer_framed_garbage_never_panics(
        authzid in "[a-z=0-9]{0,12}",
        body in "[a-zA-Z=\\x01 ]{0,40}",
    ) {
        let _ = OAuthBearerOptions::parse(&format!("n,a={authzid},\x01{body}\x01\x01"));
    }

    #[test]
    fn plain_accepts_any_non_empty_fields(
        user in "[^\\x00]{1,32}",
        pass in "[^\\x00]{1,32}",
    ) {
        let raw = format!("\0{user}\0{pass}");
        let creds = PlainCredentials::from_bytes(raw.as_bytes()).unwrap();
        prop_assert_eq!(creds.username, user);
        prop_assert_eq!(creds.password, pass);
    }
}
