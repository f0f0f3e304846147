//! The per-file DWARF context.
//!
//! A context owns the loaded DWARF sections, the parsed units, lazily
//! built per-unit parent tables, and owned snapshots of the ELF symbol,
//! section, and relocation tables. Contexts are shared by reference count
//! across all values that point into the file.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use gimli::{Reader as _, RunTimeEndian, UnitOffset, UnitSectionOffset};
use memmap2::Mmap;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::error::{DwarfError, DwarfErrorKind};

/// The reader type used throughout: endian-aware views into reference
/// counted section buffers, so values can own their handles.
pub type Reader = gimli::EndianArcSlice<RunTimeEndian>;

/// One ELF symbol table entry, snapshotted at load time.
#[derive(Clone, Debug)]
pub struct SymbolRecord {
    pub name: String,
    pub value: u64,
    pub size: u64,
    pub info: u8,
    pub other: u8,
    pub section: usize,
    pub index: usize,
}

impl SymbolRecord {
    pub fn sym_type(&self) -> u8 {
        self.info & 0xf
    }

    pub fn binding(&self) -> u8 {
        self.info >> 4
    }

    pub fn visibility(&self) -> u8 {
        self.other & 0x3
    }
}

/// One ELF section header, snapshotted at load time.
#[derive(Clone, Debug)]
pub struct SectionRecord {
    pub name: String,
    pub sh_type: u32,
    pub flags: u64,
    pub address: u64,
    pub offset: u64,
    pub size: u64,
    pub index: usize,
}

/// One relocation, attributed to the section it patches.
#[derive(Clone, Debug)]
pub struct RelocRecord {
    pub target_section: usize,
    pub offset: u64,
    pub sym_index: usize,
    pub rtype: u32,
    pub addend: Option<i64>,
}

/// An abbreviation declaration, decoupled from gimli's internal table so
/// it can flow through values.
#[derive(Clone, Debug)]
pub struct AbbrevDecl {
    pub code: u64,
    pub tag: gimli::DwTag,
    pub has_children: bool,
    pub attrs: Vec<(gimli::DwAt, gimli::DwForm)>,
}

pub struct UnitData {
    /// Offset of the unit header in `.debug_info`.
    offset: u64,
    unit: gimli::Unit<Reader>,
    /// Unit offset of the root entry.
    root: usize,
    /// Child-to-parent offsets, built on first use.
    parents: OnceCell<BTreeMap<usize, usize>>,
}

pub struct DwarfContext {
    path: String,
    dwarf: gimli::Dwarf<Reader>,
    units: Vec<UnitData>,
    symbols: Vec<SymbolRecord>,
    sections: Vec<SectionRecord>,
    relocations: Vec<RelocRecord>,
}

impl DwarfContext {
    /// Maps a file and loads its DWARF data and ELF tables.
    pub fn open(path: impl AsRef<Path>) -> Result<Arc<Self>, DwarfError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let data = unsafe { Mmap::map(&file)? };
        Self::from_bytes(&data, path.display().to_string())
    }

    /// Parses an ELF image from memory.
    pub fn from_bytes(data: &[u8], path: String) -> Result<Arc<Self>, DwarfError> {
        let elf = goblin::elf::Elf::parse(data)?;
        let endian = if elf.little_endian {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        let load_section = |id: gimli::SectionId| -> Result<Reader, gimli::Error> {
            let wanted = id.name();
            let bytes = elf
                .section_headers
                .iter()
                .find_map(|sh| {
                    let name = elf.shdr_strtab.get_at(sh.sh_name)?;
                    if name != wanted {
                        return None;
                    }
                    let start = usize::try_from(sh.sh_offset).ok()?;
                    let end = start.checked_add(usize::try_from(sh.sh_size).ok()?)?;
                    data.get(start..end)
                })
                .unwrap_or(&[]);
            Ok(Reader::new(Arc::from(bytes), endian))
        };
        let dwarf = gimli::Dwarf::load(load_section)?;

        let mut symbols = Vec::new();
        let (symtab, strtab) = if elf.syms.len() > 0 {
            (&elf.syms, &elf.strtab)
        } else {
            (&elf.dynsyms, &elf.dynstrtab)
        };
        for (index, sym) in symtab.iter().enumerate() {
            symbols.push(SymbolRecord {
                name: strtab.get_at(sym.st_name).unwrap_or("").to_string(),
                value: sym.st_value,
                size: sym.st_size,
                info: sym.st_info,
                other: sym.st_other,
                section: sym.st_shndx,
                index,
            });
        }

        let mut sections = Vec::new();
        for (index, sh) in elf.section_headers.iter().enumerate() {
            sections.push(SectionRecord {
                name: elf.shdr_strtab.get_at(sh.sh_name).unwrap_or("").to_string(),
                sh_type: sh.sh_type,
                flags: sh.sh_flags,
                address: sh.sh_addr,
                offset: sh.sh_offset,
                size: sh.sh_size,
                index,
            });
        }

        let mut relocations = Vec::new();
        for (reloc_section, relocs) in &elf.shdr_relocs {
            let target_section = elf
                .section_headers
                .get(*reloc_section)
                .map(|sh| sh.sh_info as usize)
                .unwrap_or(0);
            for r in relocs.iter() {
                relocations.push(RelocRecord {
                    target_section,
                    offset: r.r_offset,
                    sym_index: r.r_sym,
                    rtype: r.r_type,
                    addend: r.r_addend,
                });
            }
        }

        Self::assemble(path, dwarf, symbols, sections, relocations)
    }

    /// Wraps pre-loaded DWARF data without an ELF container. Used by tests
    /// that synthesize units in memory.
    pub fn from_dwarf(dwarf: gimli::Dwarf<Reader>, path: String) -> Result<Arc<Self>, DwarfError> {
        Self::assemble(path, dwarf, Vec::new(), Vec::new(), Vec::new())
    }

    fn assemble(
        path: String,
        dwarf: gimli::Dwarf<Reader>,
        symbols: Vec<SymbolRecord>,
        sections: Vec<SectionRecord>,
        relocations: Vec<RelocRecord>,
    ) -> Result<Arc<Self>, DwarfError> {
        let mut units = Vec::new();
        let mut iter = dwarf.units();
        while let Some(header) = iter.next()? {
            let offset = match header.offset() {
                UnitSectionOffset::DebugInfoOffset(o) => o.0 as u64,
                _ => continue,
            };
            let unit = dwarf.unit(header)?;
            let root = {
                let mut cursor = unit.entries();
                match cursor.next_dfs()? {
                    Some((_, entry)) => entry.offset().0,
                    None => continue,
                }
            };
            units.push(UnitData {
                offset,
                unit,
                root,
                parents: OnceCell::new(),
            });
        }

        debug!(
            path = path.as_str(),
            units = units.len(),
            symbols = symbols.len(),
            "loaded debug info"
        );

        Ok(Arc::new(DwarfContext {
            path,
            dwarf,
            units,
            symbols,
            sections,
            relocations,
        }))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn dwarf(&self) -> &gimli::Dwarf<Reader> {
        &self.dwarf
    }

    pub fn num_units(&self) -> usize {
        self.units.len()
    }

    pub fn unit(&self, index: usize) -> &gimli::Unit<Reader> {
        &self.units[index].unit
    }

    /// The `.debug_info` offset of a unit's header.
    pub fn unit_offset(&self, index: usize) -> u64 {
        self.units[index].offset
    }

    /// The unit offset of a unit's root entry.
    pub fn unit_root(&self, index: usize) -> usize {
        self.units[index].root
    }

    /// Finds the unit containing a global `.debug_info` offset.
    pub fn unit_index_of_offset(&self, offset: u64) -> Result<usize, DwarfError> {
        let idx = self
            .units
            .partition_point(|u| u.offset <= offset)
            .checked_sub(1)
            .ok_or(DwarfErrorKind::InvalidUnitRef(offset))?;
        Ok(idx)
    }

    /// Borrows the entry at a unit offset.
    pub fn entry(
        &self,
        unit: usize,
        offset: usize,
    ) -> Result<gimli::read::DebuggingInformationEntry<'_, '_, Reader>, DwarfError> {
        let data = &self.units[unit];
        data.unit
            .entry(UnitOffset(offset))
            .map_err(|e| DwarfError::new(DwarfErrorKind::InvalidDieRef(offset as u64), e))
    }

    pub fn die_tag(&self, unit: usize, offset: usize) -> Result<gimli::DwTag, DwarfError> {
        Ok(self.entry(unit, offset)?.tag())
    }

    /// Unit offsets of the direct children of an entry.
    pub fn children(&self, unit: usize, offset: usize) -> Result<Vec<usize>, DwarfError> {
        let data = &self.units[unit];
        let mut tree = data.unit.entries_tree(Some(UnitOffset(offset)))?;
        let root = tree.root()?;
        let mut iter = root.children();

        let mut out = Vec::new();
        while let Some(child) = iter.next()? {
            out.push(child.entry().offset().0);
        }
        Ok(out)
    }

    /// The unit offset of an entry's parent, or `None` for the root.
    pub fn parent_of(&self, unit: usize, offset: usize) -> Result<Option<usize>, DwarfError> {
        let data = &self.units[unit];
        let parents = data.parents.get_or_try_init(|| -> Result<_, DwarfError> {
            let mut map = BTreeMap::new();
            let mut path: Vec<usize> = Vec::new();
            let mut depth: isize = 0;

            let mut cursor = data.unit.entries();
            while let Some((delta, entry)) = cursor.next_dfs()? {
                depth += delta;
                path.truncate(depth.max(0) as usize);
                if let Some(&parent) = path.last() {
                    map.insert(entry.offset().0, parent);
                }
                path.push(entry.offset().0);
            }
            Ok(map)
        })?;
        Ok(parents.get(&offset).copied())
    }

    /// The attributes of an entry, each paired with its form from the
    /// abbreviation declaration.
    pub fn attributes(
        &self,
        unit: usize,
        offset: usize,
    ) -> Result<Vec<(gimli::read::Attribute<Reader>, gimli::DwForm)>, DwarfError> {
        let entry = self.entry(unit, offset)?;
        let specs = self
            .die_abbrev(unit, offset)?
            .map(|decl| decl.attrs)
            .unwrap_or_default();

        let mut out = Vec::new();
        let mut attrs = entry.attrs();
        let mut i = 0;
        while let Some(attr) = attrs.next()? {
            let form = specs
                .get(i)
                .map(|&(_, form)| form)
                .unwrap_or(gimli::DwForm(0));
            out.push((attr, form));
            i += 1;
        }
        Ok(out)
    }

    /// The abbreviation declaration used by an entry.
    pub fn die_abbrev(&self, unit: usize, offset: usize) -> Result<Option<AbbrevDecl>, DwarfError> {
        let data = &self.units[unit];
        let mut r = data.unit.header.range_from(UnitOffset(offset)..)?;
        let code = r.read_uleb128()?;
        Ok(self.abbrev_by_code(unit, code))
    }

    fn abbrev_by_code(&self, unit: usize, code: u64) -> Option<AbbrevDecl> {
        let abbrevs = &self.units[unit].unit.abbreviations;
        abbrevs.get(code).map(|a| AbbrevDecl {
            code,
            tag: a.tag(),
            has_children: a.has_children(),
            attrs: a
                .attributes()
                .iter()
                .map(|s| (s.name(), s.form()))
                .collect(),
        })
    }

    /// All abbreviation declarations of a unit's abbreviation table.
    /// Producers allocate codes consecutively from one.
    pub fn abbrev_decls(&self, unit: usize) -> Vec<AbbrevDecl> {
        let mut out = Vec::new();
        let mut code = 1;
        while let Some(decl) = self.abbrev_by_code(unit, code) {
            out.push(decl);
            code += 1;
        }
        out
    }

    /// Resolves a file index through the unit's line number program into a
    /// source path.
    pub fn file_path(&self, unit: usize, file_index: u64) -> Result<Option<String>, DwarfError> {
        let data = &self.units[unit];
        let program = match &data.unit.line_program {
            Some(program) => program,
            None => return Ok(None),
        };
        let header = program.header();
        let file = match header.file(file_index) {
            Some(file) => file,
            None => return Ok(None),
        };

        let name = self
            .dwarf
            .attr_string(&data.unit, file.path_name())?
            .to_string_lossy()?
            .into_owned();
        if name.starts_with('/') {
            return Ok(Some(name));
        }

        let mut dir = String::new();
        if let Some(dir_attr) = file.directory(header) {
            if let Ok(d) = self.dwarf.attr_string(&data.unit, dir_attr) {
                dir = d.to_string_lossy()?.into_owned();
            }
        }

        let mut path = String::new();
        if !dir.starts_with('/') {
            if let Some(comp_dir) = &data.unit.comp_dir {
                path.push_str(&comp_dir.to_string_lossy()?);
                path.push('/');
            }
        }
        if !dir.is_empty() {
            path.push_str(&dir);
            path.push('/');
        }
        path.push_str(&name);
        Ok(Some(path))
    }

    pub fn symbols(&self) -> &[SymbolRecord] {
        &self.symbols
    }

    pub fn sections(&self) -> &[SectionRecord] {
        &self.sections
    }

    pub fn relocations(&self) -> &[RelocRecord] {
        &self.relocations
    }
}

impl std::fmt::Debug for DwarfContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DwarfContext")
            .field("path", &self.path)
            .field("units", &self.units.len())
            .finish_non_exhaustive()
    }
}
