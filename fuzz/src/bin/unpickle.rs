#[macro_use]
extern crate afl;
use olm_account::Account;

fn main() {
    fuzz!(|data: &[u8]| {
        let _ = Account::from_pickle(&String::from_utf8_lossy(data), b"fuzz");
    });
}
