use crate::Error;
use rand::TryCryptoRng;

/// Fills `buffer` from the given randomness source.
///
/// Any failure of the source maps to [`Error::Random`]; the buffer contents
/// must then be treated as garbage.
pub(crate) fn fill_random<R: TryCryptoRng + ?Sized>(
    rng: &mut R,
    buffer: &mut [u8],
) -> Result<(), Error> {
    rng.try_fill_bytes(buffer).map_err(|_| Error::Random)
}
