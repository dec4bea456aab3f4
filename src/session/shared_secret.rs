use crate::{Curve25519PublicKey, Curve25519SecretKey, Error};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Concatenated output of the three Diffie-Hellman exchanges of an Olm
/// session handshake.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct Shared3DHSecret(Box<[u8; 96]>);

/// Root and chain keys expanded from a [`Shared3DHSecret`].
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct ExpandedSecret {
    pub(crate) root_key: Box<[u8; 32]>,
    pub(crate) chain_key: Box<[u8; 32]>,
}

impl Shared3DHSecret {
    /// The initiator's side of the handshake.
    pub(crate) fn outbound(
        identity_key: &Curve25519SecretKey,
        base_key: &Curve25519SecretKey,
        their_identity_key: &Curve25519PublicKey,
        their_one_time_key: &Curve25519PublicKey,
    ) -> Result<Self, Error> {
        // DH(I_A, O_B) || DH(E_A, I_B) || DH(E_A, O_B)
        let first = identity_key.diffie_hellman(their_one_time_key)?;
        let second = base_key.diffie_hellman(their_identity_key)?;
        let third = base_key.diffie_hellman(their_one_time_key)?;

        Ok(Self::concat(first.as_bytes(), second.as_bytes(), third.as_bytes()))
    }

    /// The responder's side of the handshake.
    pub(crate) fn inbound(
        identity_key: &Curve25519SecretKey,
        one_time_key: &Curve25519SecretKey,
        their_identity_key: &Curve25519PublicKey,
        their_base_key: &Curve25519PublicKey,
    ) -> Result<Self, Error> {
        // DH(O_B, I_A) || DH(I_B, E_A) || DH(O_B, E_A)
        let first = one_time_key.diffie_hellman(their_identity_key)?;
        let second = identity_key.diffie_hellman(their_base_key)?;
        let third = one_time_key.diffie_hellman(their_base_key)?;

        Ok(Self::concat(first.as_bytes(), second.as_bytes(), third.as_bytes()))
    }

    fn concat(first: &[u8; 32], second: &[u8; 32], third: &[u8; 32]) -> Self {
        let mut secret = Box::new([0u8; 96]);
        secret[0..32].copy_from_slice(first);
        secret[32..64].copy_from_slice(second);
        secret[64..96].copy_from_slice(third);

        Self(secret)
    }

    /// Expands the secret into a root key and a chain key.
    pub(crate) fn expand(&self, info: &[u8]) -> Result<ExpandedSecret, Error> {
        let hkdf = Hkdf::<Sha256>::new(None, self.0.as_slice());

        let mut output = Box::new([0u8; 64]);
        hkdf.expand(info, output.as_mut_slice())
            .map_err(|err| Error::Crypto(format!("HKDF expansion failed: {err}")))?;

        let mut root_key = Box::new([0u8; 32]);
        let mut chain_key = Box::new([0u8; 32]);
        root_key.copy_from_slice(&output[..32]);
        chain_key.copy_from_slice(&output[32..]);
        output.zeroize();

        Ok(ExpandedSecret {
            root_key,
            chain_key,
        })
    }
}
