//! Endian-order swap utility for raw sample buffers, the operation behind
//! the `swap-endian` CLI subcommand. Swapping is an involution: applying it
//! twice with the same element width restores the original bytes.
use crate::error::{Error, Result};

/// Reverse the byte order of every `element_width`-sized element in place.
///
/// `element_width` must be 2, 4 or 8 and must divide the buffer length.
pub fn swap_bytes_in_place(buffer: &mut [u8], element_width: usize) -> Result<()> {
    if !matches!(element_width, 2 | 4 | 8) {
        return Err(Error::InvalidArgument {
            arg: "element width",
            value: element_width.to_string(),
        });
    }
    if buffer.len() % element_width != 0 {
        return Err(Error::InvalidArgument {
            arg: "buffer length",
            value: format!("{} % {} != 0", buffer.len(), element_width),
        });
    }
    for chunk in buffer.chunks_exact_mut(element_width) {
        chunk.reverse();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_twice_restores_original() {
        let original: Vec<u8> = (0..24).collect();
        for width in [2usize, 4, 8] {
            let mut buf = original.clone();
            swap_bytes_in_place(&mut buf, width).unwrap();
            assert_ne!(buf, original);
            swap_bytes_in_place(&mut buf, width).unwrap();
            assert_eq!(buf, original);
        }
    }

    #[test]
    fn swap_reverses_each_element() {
        let mut buf = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        swap_bytes_in_place(&mut buf, 4).unwrap();
        assert_eq!(buf, vec![4, 3, 2, 1, 8, 7, 6, 5]);
    }

    #[test]
    fn invalid_width_and_length_rejected() {
        let mut buf = vec![0u8; 8];
        assert!(swap_bytes_in_place(&mut buf, 3).is_err());
        assert!(swap_bytes_in_place(&mut buf, 16).is_err());
        let mut odd = vec![0u8; 6];
        assert!(swap_bytes_in_place(&mut odd, 4).is_err());
    }
}
