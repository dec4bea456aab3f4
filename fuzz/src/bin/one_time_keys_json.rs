#[macro_use]
extern crate afl;
use olm_account::{IdentityKeys, OneTimeKeys};

fn main() {
    fuzz!(|data: &[u8]| {
        if let Ok(json) = std::str::from_utf8(data) {
            let _ = OneTimeKeys::from_json(json);
            let _ = IdentityKeys::from_json(json);
        }
    });
}
