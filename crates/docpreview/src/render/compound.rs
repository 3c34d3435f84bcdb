//! Read-only access to OLE compound files.
//!
//! Legacy Office binaries (`.doc`, `.xls`, `.ppt`) and encrypted OOXML packages
//! are compound files: a small FAT file system packed into one blob. Only what
//! password sniffing needs is supported here, which is listing directory
//! entries and reading the head of a stream. Every malformed structure yields
//! `None` rather than an error.

/// Magic bytes at offset 0 of every compound file.
pub const SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

const ENDOFCHAIN: u32 = 0xFFFF_FFFE;
const MAX_REGULAR_SECTOR: u32 = 0xFFFF_FFFA;
const HEADER_DIFAT_ENTRIES: usize = 109;
const DIR_ENTRY_SIZE: usize = 128;
const MAX_NAME_BYTES: usize = 64;

pub(crate) fn u16_at(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn u32_at(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn u64_at(data: &[u8], offset: usize) -> Option<u64> {
    let bytes = data.get(offset..offset.checked_add(8)?)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Some(u64::from_le_bytes(raw))
}

fn u32s(bytes: &[u8]) -> impl Iterator<Item = u32> + '_ {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Storage,
    Stream,
    Root,
}

/// One directory entry.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
    start: u32,
    size: u64,
}

impl DirEntry {
    pub fn size(&self) -> u64 {
        self.size
    }

    fn parse(raw: &[u8], narrow_size: bool) -> Option<Self> {
        let kind = match *raw.get(0x42)? {
            1 => EntryKind::Storage,
            2 => EntryKind::Stream,
            5 => EntryKind::Root,
            _ => return None,
        };

        let name_len = usize::from(u16_at(raw, 0x40)?).min(MAX_NAME_BYTES);
        let units: Vec<u16> = raw
            .get(..name_len)?
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .take_while(|&unit| unit != 0)
            .collect();

        let mut size = u64_at(raw, 0x78)?;
        // Version 3 files only define the low 32 bits
        if narrow_size {
            size &= 0xFFFF_FFFF;
        }

        Some(Self {
            name: String::from_utf16_lossy(&units),
            kind,
            start: u32_at(raw, 0x74)?,
            size,
        })
    }
}

/// A parsed compound file borrowing the input bytes.
#[derive(Debug)]
pub struct CompoundFile<'a> {
    data: &'a [u8],
    sector_size: usize,
    mini_sector_size: usize,
    mini_cutoff: u64,
    fat: Vec<u32>,
    mini_fat: Vec<u32>,
    entries: Vec<DirEntry>,
}

impl<'a> CompoundFile<'a> {
    /// Parse the header, FAT and directory.
    ///
    /// Returns `None` when `data` is not a compound file or its structures do
    /// not hold together.
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        if !data.starts_with(&SIGNATURE) {
            return None;
        }

        let sector_shift = u16_at(data, 0x1E)?;
        let mini_sector_shift = u16_at(data, 0x20)?;
        if !matches!(sector_shift, 9 | 12) || mini_sector_shift != 6 {
            return None;
        }

        let fat_sector_count = usize::try_from(u32_at(data, 0x2C)?).ok()?;
        let first_dir_sector = u32_at(data, 0x30)?;
        let first_mini_fat_sector = u32_at(data, 0x3C)?;
        let first_difat_sector = u32_at(data, 0x44)?;

        let mut file = Self {
            data,
            sector_size: 1 << sector_shift,
            mini_sector_size: 1 << mini_sector_shift,
            mini_cutoff: u64::from(u32_at(data, 0x38)?),
            fat: Vec::new(),
            mini_fat: Vec::new(),
            entries: Vec::new(),
        };

        for id in file.fat_sector_ids(fat_sector_count, first_difat_sector)? {
            let sector = file.sector(id)?;
            file.fat.extend(u32s(sector));
        }

        let narrow_size = file.sector_size == 512;
        let directory = file.read_chain(first_dir_sector, usize::MAX)?;
        file.entries = directory
            .chunks_exact(DIR_ENTRY_SIZE)
            .filter_map(|raw| DirEntry::parse(raw, narrow_size))
            .collect();

        if first_mini_fat_sector != ENDOFCHAIN {
            let mini_fat = file.read_chain(first_mini_fat_sector, usize::MAX)?;
            file.mini_fat = u32s(&mini_fat).collect();
        }

        Some(file)
    }

    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    /// Whether any storage or stream carries `name` (case-insensitive).
    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.kind != EntryKind::Root && entry.name.eq_ignore_ascii_case(name))
    }

    pub fn find_stream(&self, name: &str) -> Option<&DirEntry> {
        self.entries
            .iter()
            .find(|entry| entry.kind == EntryKind::Stream && entry.name.eq_ignore_ascii_case(name))
    }

    /// Read at most `limit` bytes from the start of a stream.
    pub fn read_stream(&self, entry: &DirEntry, limit: usize) -> Option<Vec<u8>> {
        let wanted = usize::try_from(entry.size).unwrap_or(usize::MAX).min(limit);
        if entry.size < self.mini_cutoff {
            self.read_mini_chain(entry.start, wanted)
        } else {
            self.read_chain(entry.start, wanted)
        }
    }

    fn sector_count(&self) -> usize {
        self.data.len().div_ceil(self.sector_size)
    }

    fn sector(&self, id: u32) -> Option<&'a [u8]> {
        let data = self.data;
        let start = usize::try_from(id).ok()?.checked_add(1)?.checked_mul(self.sector_size)?;
        if start >= data.len() {
            return None;
        }
        let end = start.saturating_add(self.sector_size).min(data.len());
        data.get(start..end)
    }

    /// FAT sector ids from the header DIFAT, then any DIFAT sector chain.
    fn fat_sector_ids(&self, count: usize, mut next_difat: u32) -> Option<Vec<u32>> {
        let mut ids: Vec<u32> = (0..HEADER_DIFAT_ENTRIES)
            .filter_map(|i| u32_at(self.data, 0x4C + i * 4))
            .filter(|&id| id <= MAX_REGULAR_SECTOR)
            .take(count)
            .collect();

        let per_sector = self.sector_size / 4 - 1;
        let mut hops = 0;
        while ids.len() < count && next_difat <= MAX_REGULAR_SECTOR {
            hops += 1;
            if hops > self.sector_count() {
                return None;
            }
            let sector = self.sector(next_difat)?;
            let mut values = u32s(sector);
            ids.extend(values.by_ref().take(per_sector).filter(|&id| id <= MAX_REGULAR_SECTOR));
            next_difat = values.next()?;
        }

        ids.truncate(count);
        Some(ids)
    }

    fn read_chain(&self, start: u32, limit: usize) -> Option<Vec<u8>> {
        let mut out = Vec::new();
        let mut id = start;
        let mut hops = 0;

        while id != ENDOFCHAIN && out.len() < limit {
            if id > MAX_REGULAR_SECTOR {
                return None;
            }
            hops += 1;
            if hops > self.fat.len() {
                return None;
            }
            out.extend_from_slice(self.sector(id)?);
            id = *self.fat.get(usize::try_from(id).ok()?)?;
        }

        out.truncate(limit);
        Some(out)
    }

    fn read_mini_chain(&self, start: u32, limit: usize) -> Option<Vec<u8>> {
        if start == ENDOFCHAIN || limit == 0 {
            return Some(Vec::new());
        }

        let root = self.entries.iter().find(|entry| entry.kind == EntryKind::Root)?;
        let container = self.read_chain(root.start, usize::try_from(root.size).ok()?)?;

        let mut out = Vec::new();
        let mut id = start;
        let mut hops = 0;

        while id != ENDOFCHAIN && out.len() < limit {
            hops += 1;
            if hops > self.mini_fat.len() {
                return None;
            }
            let index = usize::try_from(id).ok()?;
            let offset = index.checked_mul(self.mini_sector_size)?;
            out.extend_from_slice(container.get(offset..offset + self.mini_sector_size)?);
            id = *self.mini_fat.get(index)?;
        }

        out.truncate(limit);
        Some(out)
    }
}

/// Writes small version 3 compound files for tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::{DIR_ENTRY_SIZE, ENDOFCHAIN, SIGNATURE};

    const SECTOR: usize = 512;
    const MINI_SECTOR: usize = 64;
    const MINI_CUTOFF: usize = 4096;
    const FATSECT: u32 = 0xFFFF_FFFD;
    const FREESECT: u32 = 0xFFFF_FFFF;
    const NOSTREAM: u32 = 0xFFFF_FFFF;

    #[derive(Default)]
    struct Sectors {
        data: Vec<Vec<u8>>,
        fat: Vec<u32>,
    }

    impl Sectors {
        /// Append `bytes` as a sector chain and return its first sector.
        fn push_chain(&mut self, bytes: &[u8]) -> u32 {
            if bytes.is_empty() {
                return ENDOFCHAIN;
            }
            let first = self.data.len() as u32;
            let count = bytes.len().div_ceil(SECTOR);
            for (i, chunk) in bytes.chunks(SECTOR).enumerate() {
                let mut sector = chunk.to_vec();
                sector.resize(SECTOR, 0);
                self.data.push(sector);
                self.fat.push(if i + 1 == count { ENDOFCHAIN } else { first + i as u32 + 1 });
            }
            first
        }
    }

    fn dir_entry(name: &str, kind: u8, child: u32, right: u32, start: u32, size: usize) -> Vec<u8> {
        let mut raw = vec![0u8; DIR_ENTRY_SIZE];
        let units: Vec<u8> = name.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        raw[..units.len()].copy_from_slice(&units);
        raw[0x40..0x42].copy_from_slice(&((units.len() + 2) as u16).to_le_bytes());
        raw[0x42] = kind;
        raw[0x43] = 1;
        raw[0x44..0x48].copy_from_slice(&NOSTREAM.to_le_bytes());
        raw[0x48..0x4C].copy_from_slice(&right.to_le_bytes());
        raw[0x4C..0x50].copy_from_slice(&child.to_le_bytes());
        raw[0x74..0x78].copy_from_slice(&start.to_le_bytes());
        raw[0x78..0x80].copy_from_slice(&(size as u64).to_le_bytes());
        raw
    }

    /// Build a compound file with `streams` directly under the root storage.
    ///
    /// Streams under 4096 bytes go to the mini stream, larger ones to regular
    /// sectors, as real writers do.
    pub(crate) fn build(streams: &[(&str, &[u8])]) -> Vec<u8> {
        let mut sectors = Sectors::default();
        let mut mini_stream = Vec::new();
        let mut mini_fat: Vec<u32> = Vec::new();
        let mut placed = Vec::new();

        for (_, data) in streams {
            if data.is_empty() {
                placed.push((ENDOFCHAIN, 0));
            } else if data.len() < MINI_CUTOFF {
                let first = mini_fat.len() as u32;
                let count = data.len().div_ceil(MINI_SECTOR);
                for i in 0..count {
                    mini_fat.push(if i + 1 == count { ENDOFCHAIN } else { first + i as u32 + 1 });
                }
                mini_stream.extend_from_slice(data);
                mini_stream.resize(mini_fat.len() * MINI_SECTOR, 0);
                placed.push((first, data.len()));
            } else {
                placed.push((sectors.push_chain(data), data.len()));
            }
        }

        let mini_fat_bytes: Vec<u8> = mini_fat.iter().flat_map(|v| v.to_le_bytes()).collect();
        let first_mini_fat = sectors.push_chain(&mini_fat_bytes);
        let root_start = sectors.push_chain(&mini_stream);

        let root_child = if streams.is_empty() { NOSTREAM } else { 1 };
        let mut directory = dir_entry("Root Entry", 5, root_child, NOSTREAM, root_start, mini_stream.len());
        for (i, ((name, _), (start, size))) in streams.iter().zip(&placed).enumerate() {
            let right = if i + 1 < streams.len() { i as u32 + 2 } else { NOSTREAM };
            directory.extend(dir_entry(name, 2, NOSTREAM, right, *start, *size));
        }
        let first_dir = sectors.push_chain(&directory);

        let mut fat_count = 1;
        while sectors.data.len() + fat_count > fat_count * (SECTOR / 4) {
            fat_count += 1;
        }
        let first_fat = sectors.data.len() as u32;
        let mut fat = sectors.fat.clone();
        fat.extend(std::iter::repeat_n(FATSECT, fat_count));
        fat.resize(fat_count * SECTOR / 4, FREESECT);

        let mut header = vec![0u8; SECTOR];
        header[..8].copy_from_slice(&SIGNATURE);
        for (offset, value) in [(0x18, 0x003Eu16), (0x1A, 3), (0x1C, 0xFFFE), (0x1E, 9), (0x20, 6)] {
            header[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
        }
        for (offset, value) in [
            (0x2C, fat_count as u32),
            (0x30, first_dir),
            (0x38, MINI_CUTOFF as u32),
            (0x3C, first_mini_fat),
            (0x40, mini_fat_bytes.len().div_ceil(SECTOR) as u32),
            (0x44, ENDOFCHAIN),
        ] {
            header[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }
        for i in 0..109 {
            let id = if i < fat_count { first_fat + i as u32 } else { FREESECT };
            header[0x4C + i * 4..0x50 + i * 4].copy_from_slice(&id.to_le_bytes());
        }

        let mut out = header;
        for sector in sectors.data {
            out.extend(sector);
        }
        out.extend(fat.iter().flat_map(|v| v.to_le_bytes()));
        out
    }
}
