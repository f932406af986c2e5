//! Position-independent encoding of snippets
//!
//! The buffer only ever gets written once and is then mapped read-only into later processes, so
//! nothing in it can depend on where it is loaded. Names are referred to by offsets relative to
//! the field holding the offset:
//!
//! ```text
//! u32 count
//! count * { i32 source, i32 target }     // relative to the position of the field itself
//! name records { u16 length, u8 bytes[length], u8 0 }
//! ```
//!
//! Each distinct name appears in exactly one record, no matter how many snippets refer to it.

use super::binary_format::Serialize;
use super::dedup::{self, NameDedup};
use super::CacheError;
use crate::name_list::ClassNameList;
use crate::snippets::SnippetTable;
use crate::Error;
use byteorder::{BigEndian, ByteOrder};
use std::io::Cursor;

/// Width of the snippet count header
const HEADER_WIDTH: usize = <u32 as Serialize>::WIDTH;

/// Width of one `{ source, target }` pair
const PAIR_WIDTH: usize = 2 * <i32 as Serialize>::WIDTH;

/// Width of a name record, excluding the name bytes
const RECORD_OVERHEAD: usize = <u16 as Serialize>::WIDTH + <u8 as Serialize>::WIDTH;

/// Encode the snippets of a table
///
/// Returns `None` when there are no snippets (nothing is worth storing). The names are looked up
/// in the name list of the same verification pass.
pub fn serialize(
    table: &SnippetTable,
    names: &ClassNameList,
    linear_threshold: usize,
) -> Result<Option<Vec<u8>>, Error> {
    let count = table.len();
    if count == 0 {
        return Ok(None);
    }

    let names_start = HEADER_WIDTH + count * PAIR_WIDTH;
    let mut dedup = dedup::choose(count, linear_threshold)?;
    let mut records: Vec<u8> = Vec::new();
    let mut pairs: Vec<(usize, usize)> = Vec::new();
    pairs.try_reserve_exact(count)?;

    for snippet in table.iter() {
        let source = names.lookup(snippet.source)?;
        let target = names.lookup(snippet.target)?;
        let source_pos = write_record(source, names_start, &mut records, &mut *dedup)?;
        let target_pos = write_record(target, names_start, &mut records, &mut *dedup)?;
        pairs.push((source_pos, target_pos));
    }

    let total = names_start + records.len();
    if total > i32::MAX as usize {
        return Err(Error::Internal(CacheError::MalformedBuffer {
            offset: total,
            reason: "snippets too large to encode",
        }));
    }

    let mut buffer: Vec<u8> = Vec::new();
    buffer.try_reserve_exact(total)?;
    (count as u32)
        .serialize(&mut buffer)
        .map_err(CacheError::from)?;
    for (source_pos, target_pos) in pairs {
        let field = buffer.len();
        (source_pos as i32 - field as i32)
            .serialize(&mut buffer)
            .map_err(CacheError::from)?;
        let field = buffer.len();
        (target_pos as i32 - field as i32)
            .serialize(&mut buffer)
            .map_err(CacheError::from)?;
    }
    buffer.extend_from_slice(&records);

    log::debug!(
        "Encoded {} snippets into {} bytes ({} bytes of names)",
        count,
        total,
        records.len()
    );
    Ok(Some(buffer))
}

/// Find or write the record for a name, returning its absolute position in the buffer
fn write_record<'n>(
    name: &'n [u8],
    names_start: usize,
    records: &mut Vec<u8>,
    dedup: &mut (dyn NameDedup<'n> + 'n),
) -> Result<usize, Error> {
    if let Some(position) = dedup.lookup(name) {
        return Ok(position as usize);
    }

    let length = u16::try_from(name.len()).map_err(|_| {
        Error::Internal(CacheError::MalformedBuffer {
            offset: names_start + records.len(),
            reason: "name longer than 65535 bytes",
        })
    })?;
    let position = names_start + records.len();
    records.try_reserve(name.len() + RECORD_OVERHEAD)?;
    length.serialize(records).map_err(CacheError::from)?;
    records.extend_from_slice(name);
    0u8.serialize(records).map_err(CacheError::from)?;

    dedup.remember(name, position as u32)?;
    Ok(position)
}

/// Snippets decoded from a buffer
///
/// The whole buffer is checked up front, so iterating never fails.
#[derive(Copy, Clone, Debug)]
pub struct SnippetBuffer<'b> {
    bytes: &'b [u8],
    count: usize,
}

impl<'b> SnippetBuffer<'b> {
    pub fn decode(bytes: &'b [u8]) -> Result<SnippetBuffer<'b>, CacheError> {
        let mut cursor = Cursor::new(bytes);
        let count = u32::deserialize(&mut cursor).map_err(|_| CacheError::MalformedBuffer {
            offset: 0,
            reason: "missing snippet count",
        })? as usize;

        let names_start = count
            .checked_mul(PAIR_WIDTH)
            .and_then(|pairs| pairs.checked_add(HEADER_WIDTH))
            .filter(|names_start| *names_start <= bytes.len())
            .ok_or(CacheError::MalformedBuffer {
                offset: HEADER_WIDTH,
                reason: "truncated snippet pairs",
            })?;

        let buffer = SnippetBuffer { bytes, count };
        for field in (HEADER_WIDTH..names_start).step_by(<i32 as Serialize>::WIDTH) {
            buffer.check_record(field, names_start)?;
        }
        Ok(buffer)
    }

    /// Check that the relative offset at `field` points to a valid name record
    fn check_record(&self, field: usize, names_start: usize) -> Result<(), CacheError> {
        let relative = BigEndian::read_i32(&self.bytes[field..]);
        let position = field as i64 + relative as i64;
        if position < names_start as i64 || position >= self.bytes.len() as i64 {
            return Err(CacheError::MalformedBuffer {
                offset: field,
                reason: "name offset out of bounds",
            });
        }

        let position = position as usize;
        let mut cursor = Cursor::new(&self.bytes[position..]);
        let length = u16::deserialize(&mut cursor).map_err(|_| CacheError::MalformedBuffer {
            offset: position,
            reason: "truncated name length",
        })? as usize;
        let terminator = position + <u16 as Serialize>::WIDTH + length;
        match self.bytes.get(terminator) {
            Some(0) => Ok(()),
            Some(_) => Err(CacheError::MalformedBuffer {
                offset: terminator,
                reason: "name is missing its terminator",
            }),
            None => Err(CacheError::MalformedBuffer {
                offset: position,
                reason: "truncated name",
            }),
        }
    }

    /// Name referred to by the relative offset at `field` (which has already been checked)
    fn record(&self, field: usize) -> &'b [u8] {
        let relative = BigEndian::read_i32(&self.bytes[field..]);
        let position = (field as i64 + relative as i64) as usize;
        let length = BigEndian::read_u16(&self.bytes[position..]) as usize;
        let start = position + <u16 as Serialize>::WIDTH;
        &self.bytes[start..start + length]
    }

    /// Number of snippets
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Iterate over the `(source, target)` names of each snippet
    ///
    /// This can be called any number of times.
    pub fn iter(&self) -> impl Iterator<Item = (&'b [u8], &'b [u8])> + 'b {
        let buffer = *self;
        (0..self.count).map(move |idx| {
            let field = HEADER_WIDTH + idx * PAIR_WIDTH;
            (buffer.record(field), buffer.record(field + PAIR_WIDTH / 2))
        })
    }
}

#[cfg(test)]
mod test {
    use super::{serialize, SnippetBuffer};
    use crate::cache::CacheError;
    use crate::name_list::ClassNameList;
    use crate::snippets::SnippetTable;

    /// Record `count` snippets `me/Sub<i> <: me/Base<i % 3>`
    fn populate(count: usize) -> (SnippetTable, ClassNameList) {
        let mut names = ClassNameList::new();
        let mut table = SnippetTable::new();
        for i in 0..count {
            let sub = names.intern(format!("me/Sub{}", i).as_bytes()).unwrap();
            let base = names.intern(format!("me/Base{}", i % 3).as_bytes()).unwrap();
            table.record(sub, base).unwrap();
        }
        (table, names)
    }

    fn sorted_pairs(buffer: &SnippetBuffer) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = buffer
            .iter()
            .map(|(source, target)| {
                (
                    String::from_utf8(source.to_vec()).unwrap(),
                    String::from_utf8(target.to_vec()).unwrap(),
                )
            })
            .collect();
        pairs.sort();
        pairs
    }

    fn check_round_trip(count: usize, threshold: usize) {
        let (table, names) = populate(count);
        let bytes = serialize(&table, &names, threshold).unwrap().unwrap();
        let decoded = SnippetBuffer::decode(&bytes).unwrap();
        assert_eq!(decoded.len(), count);

        let mut expected: Vec<(String, String)> = (0..count)
            .map(|i| (format!("me/Sub{}", i), format!("me/Base{}", i % 3)))
            .collect();
        expected.sort();
        assert_eq!(sorted_pairs(&decoded), expected);

        // Each name gets exactly one record
        let distinct_bases = count.min(3);
        let names_len: usize = (0..count)
            .map(|i| format!("me/Sub{}", i).len() + 3)
            .chain((0..distinct_bases).map(|i| format!("me/Base{}", i).len() + 3))
            .sum();
        assert_eq!(bytes.len(), 4 + 8 * count + names_len);
    }

    #[test]
    fn every_dedup_strategy() {
        check_round_trip(1, 4);
        check_round_trip(3, 4);
        check_round_trip(4, 4);
        check_round_trip(5, 4);
        check_round_trip(40, 4);
    }

    #[test]
    fn empty_table_is_not_encoded() {
        let names = ClassNameList::new();
        let table = SnippetTable::new();
        assert!(serialize(&table, &names, 4).unwrap().is_none());
    }

    #[test]
    fn repeated_name_is_stored_once() {
        let mut names = ClassNameList::new();
        let sub = names.intern(b"me/Sub").unwrap();
        let a = names.intern(b"me/A").unwrap();
        let b = names.intern(b"me/B").unwrap();
        let mut table = SnippetTable::new();
        table.record(sub, a).unwrap();
        table.record(sub, b).unwrap();

        let bytes = serialize(&table, &names, 4).unwrap().unwrap();
        assert_eq!(bytes.len(), 4 + 2 * 8 + (6 + 3) + (4 + 3) + (4 + 3));
        let occurrences = bytes.windows(6).filter(|window| *window == b"me/Sub").count();
        assert_eq!(occurrences, 1);

        let decoded = SnippetBuffer::decode(&bytes).unwrap();
        assert_eq!(
            sorted_pairs(&decoded),
            vec![
                (String::from("me/Sub"), String::from("me/A")),
                (String::from("me/Sub"), String::from("me/B")),
            ]
        );

        // Restartable
        assert_eq!(decoded.iter().count(), 2);
        assert_eq!(decoded.iter().count(), 2);
    }

    #[test]
    fn exact_layout() {
        let mut names = ClassNameList::new();
        let a = names.intern(b"A").unwrap();
        let b = names.intern(b"B").unwrap();
        let mut table = SnippetTable::new();
        table.record(a, b).unwrap();

        let bytes = serialize(&table, &names, 4).unwrap().unwrap();
        assert_eq!(
            bytes,
            vec![
                0, 0, 0, 1, // count
                0, 0, 0, 8, // source: 4 + 8 = 12
                0, 0, 0, 8, // target: 8 + 8 = 16
                0, 1, b'A', 0, // name at 12
                0, 1, b'B', 0, // name at 16
            ]
        );
    }

    #[test]
    fn malformed_buffers() {
        let truncated_pairs = [0, 0, 0, 2, 0, 0, 0, 8];
        let out_of_bounds = [0, 0, 0, 1, 0, 0, 0, 100, 0, 0, 0, 8, 0, 1, b'A', 0];
        let backwards = [0, 0, 0, 1, 0xff, 0xff, 0xff, 0xfc, 0, 0, 0, 4, 0, 1, b'A', 0];
        let no_terminator = [0, 0, 0, 1, 0, 0, 0, 8, 0, 0, 0, 4, 0, 1, b'A', 7];

        for bytes in [
            &[0u8, 0][..],
            &truncated_pairs[..],
            &out_of_bounds[..],
            &backwards[..],
            &no_terminator[..],
        ] {
            assert!(
                matches!(
                    SnippetBuffer::decode(bytes),
                    Err(CacheError::MalformedBuffer { .. })
                ),
                "{:?} should be rejected",
                bytes
            );
        }
    }
}
