//! The CLI header (ECMA-335 §II.25.3.3) and the metadata root it points at (§II.24.2.1):
//! the `BSJB` signature, stream directory, and the five heaps assembled from it.

use std::io::{Cursor, Error, ErrorKind};

use bitflags::bitflags;

use crate::metadata::heaps::{BlobHeap, GuidHeap, StringHeap, UserStringHeap};
use crate::metadata::indices::sizes::IndexSizes;
use crate::metadata::table::TableHeap;
use crate::pe::DataDirectory;
use crate::utilities::{impl_from_byte_stream, read_bytes_slice_from_stream, read_string_from_stream_into, FromByteStream};

bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct RuntimeFlags: u32 {
		const IL_ONLY = 0x0000_0001;
		const REQUIRES_32_BIT = 0x0000_0002;
		const IL_LIBRARY = 0x0000_0004;
		const STRONG_NAME_SIGNED = 0x0000_0008;
		const NATIVE_ENTRYPOINT = 0x0000_0010;
		const TRACK_DEBUG_DATA = 0x0001_0000;
		const PREFERS_32_BIT = 0x0002_0000;
	}
}

impl FromByteStream for RuntimeFlags {
	fn read(stream: &mut Cursor<&[u8]>, sizes: &IndexSizes) -> std::io::Result<Self> {
		Ok(Self::from_bits_retain(u32::read(stream, sizes)?))
	}
}

/// The 72-byte `IMAGE_COR20_HEADER` a PE's CLI data directory (entry 14) points at.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CLIHeader {
	pub cb: u32,
	pub major_runtime_version: u16,
	pub minor_runtime_version: u16,
	pub metadata: DataDirectory,
	pub flags: RuntimeFlags,
	pub entry_point_token: u32,
	pub resources: DataDirectory,
	pub strong_name_signature: DataDirectory,
	pub code_manager_table: DataDirectory,
	pub vtable_fixups: DataDirectory,
	pub export_address_table_jumps: DataDirectory,
	pub managed_native_header: DataDirectory,
}

impl_from_byte_stream!(CLIHeader);

/// The parsed metadata root: version string plus the five heaps it directs readers to.
/// Borrows its bytes from the owning module's metadata buffer for as long as the module lives.
#[derive(Debug)]
pub struct MetadataRoot<'l> {
	pub version: String,
	pub strings: StringHeap<'l>,
	pub user_strings: UserStringHeap<'l>,
	pub blobs: BlobHeap<'l>,
	pub guids: GuidHeap<'l>,
	pub tables: TableHeap,
}

const MAGIC: [u8; 4] = *b"BSJB";

impl<'l> MetadataRoot<'l> {
	#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
	pub fn parse(data: &'l [u8]) -> std::io::Result<Self> {
		let mut stream = Cursor::new(data);

		let magic = <[u8; 4]>::read(&mut stream, &IndexSizes::ZERO)?;
		if magic != MAGIC {
			return Err(Error::new(ErrorKind::InvalidData, "missing BSJB metadata root signature"));
		}

		let _major_version = u16::read(&mut stream, &IndexSizes::ZERO)?;
		let _minor_version = u16::read(&mut stream, &IndexSizes::ZERO)?;
		let _reserved = u32::read(&mut stream, &IndexSizes::ZERO)?;
		let version_length = u32::read(&mut stream, &IndexSizes::ZERO)? as usize;

		let version_bytes = read_bytes_slice_from_stream(&mut stream, version_length)?;
		let version_end = version_bytes.iter().position(|b| *b == 0).unwrap_or(version_bytes.len());
		let version = std::str::from_utf8(&version_bytes[..version_end])
			.map_err(|_| Error::new(ErrorKind::InvalidData, "non UTF-8 metadata version string"))?
			.to_owned();

		let _flags = u16::read(&mut stream, &IndexSizes::ZERO)?;
		let stream_count = u16::read(&mut stream, &IndexSizes::ZERO)?;

		let mut strings: Option<&[u8]> = None;
		let mut user_strings: Option<&[u8]> = None;
		let mut blobs: Option<&[u8]> = None;
		let mut guids: Option<&[u8]> = None;
		let mut table_stream: Option<&[u8]> = None;

		for _ in 0..stream_count {
			let offset = u32::read(&mut stream, &IndexSizes::ZERO)? as usize;
			let size = u32::read(&mut stream, &IndexSizes::ZERO)? as usize;

			let mut name_buf = [0u8; 32];
			let name = read_string_from_stream_into::<4>(&mut stream, &mut name_buf)?;

			let range = data.get(offset..offset + size).ok_or_else(|| Error::new(ErrorKind::UnexpectedEof, "stream header points outside the metadata root"))?;

			match name {
				"#Strings" => strings = Some(range),
				"#US" => user_strings = Some(range),
				"#Blob" => blobs = Some(range),
				"#GUID" => guids = Some(range),
				"#~" | "#-" => table_stream = Some(range),
				_ => {}
			}
		}

		let tables = TableHeap::read(table_stream.ok_or_else(|| Error::new(ErrorKind::InvalidData, "metadata root has no #~ table stream"))?)?;

		Ok(Self {
			version,
			strings: StringHeap::new(strings.unwrap_or(&[])),
			user_strings: UserStringHeap::new(user_strings.unwrap_or(&[])),
			blobs: BlobHeap::new(blobs.unwrap_or(&[])),
			guids: GuidHeap::new(guids.unwrap_or(&[])),
			tables,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn empty_table_stream() -> Vec<u8> {
		let mut buf = Vec::new();
		buf.extend_from_slice(&0u32.to_le_bytes()); // reserved_0
		buf.push(1); // major_version
		buf.push(0); // minor_version
		buf.push(0); // heap_sizes
		buf.push(0); // reserved_1
		buf.extend_from_slice(&0u64.to_le_bytes()); // valid
		buf.extend_from_slice(&0u64.to_le_bytes()); // sorted
		buf
	}

	/// A `BSJB` root with every stream present, in an order that exercises both the directory
	/// walk (name lookup by stream header, not position) and the 4-byte name padding.
	fn root_bytes(version: &str, strings: &[u8], blobs: &[u8]) -> Vec<u8> {
		let table_stream = empty_table_stream();
		let streams: [(&str, &[u8]); 3] = [("#~", &table_stream), ("#Strings", strings), ("#Blob", blobs)];

		let mut header = Vec::new();
		header.extend_from_slice(b"BSJB");
		header.extend_from_slice(&1u16.to_le_bytes());
		header.extend_from_slice(&0u16.to_le_bytes());
		header.extend_from_slice(&0u32.to_le_bytes());
		let mut version_bytes = version.as_bytes().to_vec();
		version_bytes.push(0);
		while version_bytes.len() % 4 != 0 {
			version_bytes.push(0);
		}
		header.extend_from_slice(&(version_bytes.len() as u32).to_le_bytes());
		header.extend_from_slice(&version_bytes);
		header.extend_from_slice(&0u16.to_le_bytes());
		header.extend_from_slice(&(streams.len() as u16).to_le_bytes());

		let name_fields: Vec<Vec<u8>> = streams
			.iter()
			.map(|(name, _)| {
				let mut nf = name.as_bytes().to_vec();
				nf.push(0);
				while nf.len() % 4 != 0 {
					nf.push(0);
				}
				nf
			})
			.collect();

		let dir_len: usize = streams.len() * 8 + name_fields.iter().map(|n| n.len()).sum::<usize>();
		let mut body_offset = header.len() + dir_len;
		let mut dir = Vec::new();
		let mut bodies = Vec::new();
		for ((_, bytes), nf) in streams.iter().zip(name_fields.iter()) {
			dir.extend_from_slice(&(body_offset as u32).to_le_bytes());
			dir.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
			dir.extend_from_slice(nf);
			bodies.extend_from_slice(bytes);
			body_offset += bytes.len();
		}

		let mut buf = header;
		buf.extend_from_slice(&dir);
		buf.extend_from_slice(&bodies);
		buf
	}

	#[test]
	fn rejects_a_buffer_without_the_bsjb_signature() {
		let data = [0u8; 16];
		assert!(MetadataRoot::parse(&data).is_err());
	}

	#[test]
	fn reads_the_version_string_and_every_named_stream_regardless_of_directory_order() {
		let strings = b"\0Foo\0".as_slice();
		let blobs = [0x00u8, 0x02, 0xAA, 0xBB];
		let data = root_bytes("v4.0.30319", strings, &blobs);

		let root = MetadataRoot::parse(&data).unwrap();
		assert_eq!(root.version, "v4.0.30319");
		assert_eq!(root.strings.get(crate::metadata::heaps::StringIndex(1)).unwrap(), "Foo");
		assert_eq!(root.blobs.get(crate::metadata::heaps::BlobIndex(1)).unwrap(), &[0xAA, 0xBB]);
	}

	#[test]
	fn missing_heaps_read_as_empty_instead_of_failing() {
		let table_stream = empty_table_stream();
		let streams: [(&str, &[u8]); 1] = [("#~", &table_stream)];
		let data = {
			let mut header = Vec::new();
			header.extend_from_slice(b"BSJB");
			header.extend_from_slice(&1u16.to_le_bytes());
			header.extend_from_slice(&0u16.to_le_bytes());
			header.extend_from_slice(&0u32.to_le_bytes());
			header.extend_from_slice(&4u32.to_le_bytes());
			header.extend_from_slice(b"v4\0\0");
			header.extend_from_slice(&0u16.to_le_bytes());
			header.extend_from_slice(&(streams.len() as u16).to_le_bytes());
			let stream_offset = header.len() + 8 + 4;
			header.extend_from_slice(&(stream_offset as u32).to_le_bytes());
			header.extend_from_slice(&(table_stream.len() as u32).to_le_bytes());
			header.extend_from_slice(b"#~\0\0");
			header.extend_from_slice(&table_stream);
			header
		};

		let root = MetadataRoot::parse(&data).unwrap();
		assert_eq!(root.strings.get(crate::metadata::heaps::StringIndex(0)).unwrap(), "");
		assert_eq!(root.blobs.get(crate::metadata::heaps::BlobIndex(0)).unwrap(), &[] as &[u8]);
	}

	#[test]
	fn a_stream_header_pointing_outside_the_root_is_rejected() {
		let mut data = root_bytes("v4.0.30319", b"\0Foo\0", &[0x00]);
		let len = data.len() as u32;

		// Find the "#~" stream's directory entry by its padded name field, then corrupt the
		// size field immediately preceding it so the stream's range runs past the buffer.
		let name_at = data.windows(4).position(|w| w == b"#~\0\0").expect("#~ name field present");
		let size_at = name_at - 4;
		data[size_at..size_at + 4].copy_from_slice(&(len * 2).to_le_bytes());

		assert!(MetadataRoot::parse(&data).is_err());
	}
}
