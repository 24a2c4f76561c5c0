//! The five metadata heaps (ECMA-335 §II.24.2.2): `#Strings`, `#US`, `#Blob`, `#GUID` and the
//! `#~` table stream itself (handled in [`crate::metadata::table`]).
//!
//! Every heap is a borrowed byte slice rather than an owned buffer - the slices borrow from the
//! PE section data the [`crate::metadata::root::MetadataRoot`] was built from, which outlives
//! every derived view for the life of the loaded module.

use std::io::{Cursor, Error, ErrorKind};
use uuid::Uuid;

use crate::metadata::indices::sizes::IndexSizes;
use crate::utilities::{read_compressed_u32, FromByteStream};

/// A one-based offset into the `#Strings` heap.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringIndex(pub u32);

/// A one-based offset into the `#US` heap.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserStringIndex(pub u32);

/// A one-based offset into the `#Blob` heap.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobIndex(pub u32);

/// A one-based index (not a byte offset: multiply by 16) into the `#GUID` heap.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct GuidIndex(pub u32);

macro_rules! impl_debug_and_read {
	($name:ident, $field:ident) => {
		impl std::fmt::Debug for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
				write!(f, concat!(stringify!($name), "({})"), self.0)
			}
		}

		impl FromByteStream for $name {
			fn read(stream: &mut Cursor<&[u8]>, sizes: &IndexSizes) -> std::io::Result<Self> {
				match sizes.$field {
					2 => Ok(Self(u16::read(stream, sizes)? as u32)),
					_ => Ok(Self(u32::read(stream, sizes)?)),
				}
			}
		}
	};
}

impl_debug_and_read!(StringIndex, string);
impl_debug_and_read!(UserStringIndex, string);
impl_debug_and_read!(BlobIndex, blob);
impl_debug_and_read!(GuidIndex, guid);

/// The `#Strings` heap: a sequence of `\0`-terminated UTF-8 strings, indexed by byte offset.
/// Offset `0` always denotes the empty string.
#[derive(Clone, Copy)]
pub struct StringHeap<'l>(pub(crate) &'l [u8]);

impl<'l> StringHeap<'l> {
	pub fn new(data: &'l [u8]) -> Self {
		Self(data)
	}

	pub fn get(&self, index: StringIndex) -> std::io::Result<&'l str> {
		let start = index.0 as usize;
		if start == 0 {
			return Ok("");
		}
		let bytes = self.0.get(start..).ok_or_else(|| Error::from(ErrorKind::UnexpectedEof))?;
		let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
		std::str::from_utf8(&bytes[..end]).map_err(|_| Error::from(ErrorKind::InvalidData))
	}
}

/// The `#US` heap: length-prefixed UTF-16 string literals referenced from `ldstr` instructions.
/// Not consulted by reflection over declarations, but exposed for completeness.
#[derive(Clone, Copy)]
pub struct UserStringHeap<'l>(pub(crate) &'l [u8]);

impl<'l> UserStringHeap<'l> {
	pub fn new(data: &'l [u8]) -> Self {
		Self(data)
	}

	pub fn get(&self, index: UserStringIndex) -> std::io::Result<String> {
		let start = index.0 as usize;
		let bytes = self.0.get(start..).ok_or_else(|| Error::from(ErrorKind::UnexpectedEof))?;
		let mut cursor = Cursor::new(bytes);
		let len = read_compressed_u32(&mut cursor)? as usize;
		let body_start = cursor.position() as usize;
		// The trailing byte past the UTF-16 payload is a has-special-chars marker, not part of
		// the string; only full `u16` pairs are decoded.
		let utf16_len = len.saturating_sub(1) / 2;
		let units = (0..utf16_len)
			.map(|i| {
				let off = body_start + i * 2;
				u16::from_le_bytes([bytes[off], bytes[off + 1]])
			})
			.collect::<Vec<_>>();
		String::from_utf16(&units).map_err(|_| Error::from(ErrorKind::InvalidData))
	}
}

/// The `#Blob` heap: length-prefixed opaque byte ranges (signatures, constant values, custom
/// attribute arguments). Offset `0` always denotes the empty blob.
#[derive(Clone, Copy)]
pub struct BlobHeap<'l>(pub(crate) &'l [u8]);

impl<'l> BlobHeap<'l> {
	pub fn new(data: &'l [u8]) -> Self {
		Self(data)
	}

	pub fn get(&self, index: BlobIndex) -> std::io::Result<&'l [u8]> {
		let start = index.0 as usize;
		if start == 0 {
			return Ok(&[]);
		}
		let bytes = self.0.get(start..).ok_or_else(|| Error::from(ErrorKind::UnexpectedEof))?;
		let mut cursor = Cursor::new(bytes);
		let len = read_compressed_u32(&mut cursor)? as usize;
		let body_start = cursor.position() as usize;
		bytes.get(body_start..body_start + len).ok_or_else(|| Error::from(ErrorKind::UnexpectedEof))
	}
}

/// The `#GUID` heap: a packed array of 16-byte GUIDs, indexed one-based (index `n` covers bytes
/// `(n-1)*16 .. n*16`).
#[derive(Clone, Copy)]
pub struct GuidHeap<'l>(pub(crate) &'l [u8]);

impl<'l> GuidHeap<'l> {
	pub fn new(data: &'l [u8]) -> Self {
		Self(data)
	}

	pub fn get(&self, index: GuidIndex) -> std::io::Result<Uuid> {
		if index.0 == 0 {
			return Ok(Uuid::nil());
		}
		let start = (index.0 as usize - 1) * 16;
		let bytes = self.0.get(start..start + 16).ok_or_else(|| Error::from(ErrorKind::UnexpectedEof))?;
		let mut buf = [0u8; 16];
		buf.copy_from_slice(bytes);
		Ok(Uuid::from_bytes_le(buf))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn string_heap_offset_zero_is_empty() {
		let heap = StringHeap::new(b"\0Foo\0Bar\0");
		assert_eq!(heap.get(StringIndex(0)).unwrap(), "");
	}

	#[test]
	fn string_heap_reads_up_to_the_nul_terminator() {
		let heap = StringHeap::new(b"\0Foo\0Bar\0");
		assert_eq!(heap.get(StringIndex(1)).unwrap(), "Foo");
		assert_eq!(heap.get(StringIndex(5)).unwrap(), "Bar");
	}

	#[test]
	fn string_heap_rejects_an_out_of_range_offset() {
		let heap = StringHeap::new(b"\0Foo\0");
		assert!(heap.get(StringIndex(100)).is_err());
	}

	#[test]
	fn blob_heap_offset_zero_is_empty() {
		let heap = BlobHeap::new(&[0x00]);
		assert_eq!(heap.get(BlobIndex(0)).unwrap(), &[] as &[u8]);
	}

	#[test]
	fn blob_heap_reads_a_length_prefixed_range() {
		let heap = BlobHeap::new(&[0x00, 0x03, 0xAA, 0xBB, 0xCC]);
		assert_eq!(heap.get(BlobIndex(1)).unwrap(), &[0xAA, 0xBB, 0xCC]);
	}

	#[test]
	fn blob_heap_rejects_a_truncated_body() {
		let heap = BlobHeap::new(&[0x00, 0x05, 0xAA]);
		assert!(heap.get(BlobIndex(1)).is_err());
	}

	#[test]
	fn guid_heap_index_zero_is_nil() {
		let heap = GuidHeap::new(&[0xFF; 16]);
		assert_eq!(heap.get(GuidIndex(0)).unwrap(), Uuid::nil());
	}

	#[test]
	fn guid_heap_indexes_are_one_based_sixteen_byte_slots() {
		let mut bytes = vec![0u8; 32];
		bytes[16..32].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]);
		let heap = GuidHeap::new(&bytes);
		let expected = Uuid::from_bytes_le([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]);
		assert_eq!(heap.get(GuidIndex(2)).unwrap(), expected);
	}

	#[test]
	fn user_string_heap_decodes_utf16_and_drops_the_trailer_byte() {
		// Length byte counts the UTF-16 payload plus the trailing has-special-chars marker.
		let mut bytes = vec![5u8];
		bytes.extend_from_slice(&[b'H', 0, b'i', 0]);
		bytes.push(0x00);
		let heap = UserStringHeap::new(&bytes);
		assert_eq!(heap.get(UserStringIndex(0)).unwrap(), "Hi");
	}
}
