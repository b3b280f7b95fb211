//! Chunk-key codec.
//!
//! Builds the wire-visible Zarr v2 chunk key from a rank and an index tuple:
//! indices are joined with the variable's dimension separator, printed as
//! unsigned decimal with no padding. See the Zarr v2 spec's "chunk key
//! encoding" section for the format this mirrors.

use crate::error::CacheError;
use crate::types::{is_legal_separator, ChunkIndices, VarMeta};

/// A chunk's object-store address, split into the variable's stable prefix
/// and the chunk-specific suffix.
///
/// Concatenating `varkey`, the dimension separator, and `chunkkey` (via the
/// store's own path join) yields the full object path used on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkKey {
    /// Object-store path prefix of the variable.
    pub varkey: String,
    /// Separator-joined decimal encoding of the chunk-index tuple.
    pub chunkkey: String,
}

impl ChunkKey {
    /// The full object-store path for this chunk, joining `varkey` and
    /// `chunkkey` with `sep`. Empty `chunkkey` (rank 0) yields `varkey` alone.
    pub fn object_path(&self, sep: char) -> String {
        if self.chunkkey.is_empty() {
            self.varkey.clone()
        } else {
            format!("{}{}{}", self.varkey, sep, self.chunkkey)
        }
    }
}

/// Build the chunk key string `i0<sep>i1<sep>...<sep>i{rank-1}` for `indices`.
///
/// `rank == 0` yields the empty string. Fails with [`CacheError::InvalidArgument`]
/// if `separator` is not one of the legal Zarr v2 separators (`.` or `/`).
pub fn build_chunk_key(
    rank: usize,
    indices: &ChunkIndices,
    separator: char,
) -> Result<String, CacheError> {
    if !is_legal_separator(separator) {
        return Err(CacheError::invalid_argument(format!(
            "illegal dimension separator: {separator:?}"
        )));
    }
    debug_assert_eq!(indices.len(), rank, "indices length must match rank");

    let mut key = String::new();
    for (r, idx) in indices.iter().take(rank).enumerate() {
        if r > 0 {
            key.push(separator);
        }
        key.push_str(&idx.to_string());
    }
    Ok(key)
}

/// Compose the full [`ChunkKey`] (variable prefix + chunk key) for `indices`
/// against `var`'s configured separator.
pub fn build_chunk_path(var: &VarMeta, indices: &ChunkIndices) -> Result<ChunkKey, CacheError> {
    let chunkkey = build_chunk_key(var.ndims, indices, var.dimension_separator)?;
    Ok(ChunkKey {
        varkey: var.varkey.clone(),
        chunkkey,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s1_rank2_dot_separator() {
        let key = build_chunk_key(2, &[2, 4], '.').unwrap();
        assert_eq!(key, "2.4");
    }

    #[test]
    fn s2_rank1_slash_separator() {
        let key = build_chunk_key(1, &[0], '/').unwrap();
        assert_eq!(key, "0");
    }

    #[test]
    fn s6_rank0_is_empty() {
        let key = build_chunk_key(0, &[], '.').unwrap();
        assert_eq!(key, "");
    }

    #[test]
    fn rejects_illegal_separator() {
        let err = build_chunk_key(2, &[1, 2], ',').unwrap_err();
        assert_eq!(err, CacheError::invalid_argument("illegal dimension separator: ','"));
    }

    #[test]
    fn no_leading_zeros_no_sign() {
        let key = build_chunk_key(3, &[0, 10, 2], '.').unwrap();
        assert_eq!(key, "0.10.2");
    }

    #[test]
    fn distinct_tuples_yield_distinct_keys() {
        let a = build_chunk_key(2, &[1, 23], '.').unwrap();
        let b = build_chunk_key(2, &[12, 3], '.').unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn object_path_joins_varkey_and_chunkkey() {
        let var = VarMeta::new("grp/arr", 2, 1_000_000).with_separator('.');
        let key = build_chunk_path(&var, &[2, 4]).unwrap();
        assert_eq!(key.varkey, "grp/arr");
        assert_eq!(key.chunkkey, "2.4");
        assert_eq!(key.object_path('.'), "grp/arr.2.4");
    }

    #[test]
    fn object_path_rank_zero_is_just_varkey() {
        let var = VarMeta::new("scalar", 0, 8);
        let key = build_chunk_path(&var, &[]).unwrap();
        assert_eq!(key.object_path('.'), "scalar");
    }
}
