//! DWARF and ELF value kinds.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use dwquery_lang::value::{Brevity, CmpResult, Value, ValueKind, ValueType};
use dwquery_lang::value_impl_common;

use crate::context::{AbbrevDecl, DwarfContext, Reader};
use crate::coverage::Coverage;
use crate::cst::{DW_AT_DOM, DW_FORM_DOM, DW_OP_DOM, DW_TAG_DOM};

/// Whether references cross DWARF import points transparently (cooked) or
/// not (raw).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Doneness {
    Raw,
    Cooked,
}

impl Doneness {
    pub fn is_cooked(self) -> bool {
        self == Doneness::Cooked
    }
}

fn ctx_key(ctx: &Arc<DwarfContext>) -> usize {
    Arc::as_ptr(ctx) as usize
}

fn dom_name(dom: &crate::cst::EnumDom, value: u64) -> String {
    let mut s = String::new();
    use dwquery_lang::cst::ConstantDom;
    let _ = dom.show(value as i128, &mut s, Brevity::Brief);
    s
}

/// A whole DWARF file.
#[derive(Clone, Debug)]
pub struct DwarfValue {
    ctx: Arc<DwarfContext>,
    doneness: Doneness,
    pos: usize,
}

impl DwarfValue {
    pub const VTYPE: ValueType = ValueType::new(8, "T_DWARF");

    pub fn new(ctx: Arc<DwarfContext>, doneness: Doneness, pos: usize) -> Self {
        DwarfValue { ctx, doneness, pos }
    }

    pub fn ctx(&self) -> &Arc<DwarfContext> {
        &self.ctx
    }

    pub fn doneness(&self) -> Doneness {
        self.doneness
    }

    pub fn with_doneness(&self, doneness: Doneness) -> Self {
        DwarfValue {
            ctx: Arc::clone(&self.ctx),
            doneness,
            pos: self.pos,
        }
    }
}

impl ValueKind for DwarfValue {
    const KIND: ValueType = DwarfValue::VTYPE;
}

impl Value for DwarfValue {
    value_impl_common!();

    fn show(&self, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
        write!(w, "<Dwarf \"{}\">", self.ctx.path())
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn cmp_value(&self, other: &dyn Value) -> CmpResult {
        match other.downcast_ref::<DwarfValue>() {
            Some(that) => CmpResult::from_ord(
                (ctx_key(&self.ctx), self.doneness).cmp(&(ctx_key(&that.ctx), that.doneness)),
            ),
            None => CmpResult::Fail,
        }
    }
}

/// A compilation unit.
#[derive(Clone, Debug)]
pub struct CuValue {
    ctx: Arc<DwarfContext>,
    unit: usize,
    doneness: Doneness,
    pos: usize,
}

impl CuValue {
    pub const VTYPE: ValueType = ValueType::new(9, "T_CU");

    pub fn new(ctx: Arc<DwarfContext>, unit: usize, doneness: Doneness, pos: usize) -> Self {
        CuValue {
            ctx,
            unit,
            doneness,
            pos,
        }
    }

    pub fn ctx(&self) -> &Arc<DwarfContext> {
        &self.ctx
    }

    pub fn unit(&self) -> usize {
        self.unit
    }

    pub fn offset(&self) -> u64 {
        self.ctx.unit_offset(self.unit)
    }

    pub fn doneness(&self) -> Doneness {
        self.doneness
    }

    pub fn with_doneness(&self, doneness: Doneness) -> Self {
        CuValue {
            doneness,
            ..self.clone()
        }
    }
}

impl ValueKind for CuValue {
    const KIND: ValueType = CuValue::VTYPE;
}

impl Value for CuValue {
    value_impl_common!();

    fn show(&self, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
        write!(w, "CU {:#x}", self.offset())
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn cmp_value(&self, other: &dyn Value) -> CmpResult {
        match other.downcast_ref::<CuValue>() {
            Some(that) => CmpResult::from_ord(
                (ctx_key(&self.ctx), self.unit, self.doneness).cmp(&(
                    ctx_key(&that.ctx),
                    that.unit,
                    that.doneness,
                )),
            ),
            None => CmpResult::Fail,
        }
    }
}

/// A debug information entry. Cooked entries remember the importing
/// `DW_TAG_imported_unit` entry they were reached through, so `parent`
/// can return across the import point.
#[derive(Clone, Debug)]
pub struct DieValue {
    ctx: Arc<DwarfContext>,
    unit: usize,
    offset: usize,
    import: Option<Rc<DieValue>>,
    doneness: Doneness,
    pos: usize,
}

impl DieValue {
    pub const VTYPE: ValueType = ValueType::new(10, "T_NODE");

    pub fn new(
        ctx: Arc<DwarfContext>,
        unit: usize,
        offset: usize,
        doneness: Doneness,
        pos: usize,
    ) -> Self {
        DieValue {
            ctx,
            unit,
            offset,
            import: None,
            doneness,
            pos,
        }
    }

    pub fn with_import(mut self, import: Option<Rc<DieValue>>) -> Self {
        self.import = import;
        self
    }

    pub fn ctx(&self) -> &Arc<DwarfContext> {
        &self.ctx
    }

    pub fn unit(&self) -> usize {
        self.unit
    }

    /// Offset within the unit.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Offset within `.debug_info`.
    pub fn global_offset(&self) -> u64 {
        self.ctx.unit_offset(self.unit) + self.offset as u64
    }

    pub fn import(&self) -> Option<&Rc<DieValue>> {
        self.import.as_ref()
    }

    pub fn doneness(&self) -> Doneness {
        self.doneness
    }

    pub fn with_doneness(&self, doneness: Doneness) -> Self {
        DieValue {
            doneness,
            ..self.clone()
        }
    }

    pub fn tag(&self) -> Option<gimli::DwTag> {
        self.ctx.die_tag(self.unit, self.offset).ok()
    }
}

impl ValueKind for DieValue {
    const KIND: ValueType = DieValue::VTYPE;
}

impl Value for DieValue {
    value_impl_common!();

    fn show(&self, w: &mut dyn fmt::Write, brv: Brevity) -> fmt::Result {
        let tag = match self.tag() {
            Some(tag) => dom_name(&DW_TAG_DOM, tag.0 as u64),
            None => "???".to_string(),
        };
        write!(w, "[{:x}] {}", self.global_offset(), tag)?;

        if brv == Brevity::Full {
            for line in crate::atval::attribute_lines(self) {
                write!(w, "\n\t{line}")?;
            }
        }
        Ok(())
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn cmp_value(&self, other: &dyn Value) -> CmpResult {
        match other.downcast_ref::<DieValue>() {
            // The owning context is compared by identity before any
            // offsets; references into alternate debug files never
            // compare equal.
            Some(that) => CmpResult::from_ord(
                (ctx_key(&self.ctx), self.unit, self.offset, self.doneness).cmp(&(
                    ctx_key(&that.ctx),
                    that.unit,
                    that.offset,
                    that.doneness,
                )),
            ),
            None => CmpResult::Fail,
        }
    }
}

/// An attribute of a DIE.
#[derive(Clone, Debug)]
pub struct AttrValue {
    ctx: Arc<DwarfContext>,
    unit: usize,
    die_offset: usize,
    attr: gimli::read::Attribute<Reader>,
    form: gimli::DwForm,
    doneness: Doneness,
    pos: usize,
}

impl AttrValue {
    pub const VTYPE: ValueType = ValueType::new(11, "T_ATTR");

    pub fn new(
        ctx: Arc<DwarfContext>,
        unit: usize,
        die_offset: usize,
        attr: gimli::read::Attribute<Reader>,
        form: gimli::DwForm,
        doneness: Doneness,
        pos: usize,
    ) -> Self {
        AttrValue {
            ctx,
            unit,
            die_offset,
            attr,
            form,
            doneness,
            pos,
        }
    }

    pub fn ctx(&self) -> &Arc<DwarfContext> {
        &self.ctx
    }

    pub fn unit(&self) -> usize {
        self.unit
    }

    pub fn die_offset(&self) -> usize {
        self.die_offset
    }

    pub fn attr(&self) -> &gimli::read::Attribute<Reader> {
        &self.attr
    }

    pub fn form(&self) -> gimli::DwForm {
        self.form
    }

    pub fn doneness(&self) -> Doneness {
        self.doneness
    }

    pub fn with_doneness(&self, doneness: Doneness) -> Self {
        AttrValue {
            doneness,
            ..self.clone()
        }
    }
}

impl ValueKind for AttrValue {
    const KIND: ValueType = AttrValue::VTYPE;
}

impl Value for AttrValue {
    value_impl_common!();

    fn show(&self, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
        write!(
            w,
            "{} ({})\t{}",
            dom_name(&DW_AT_DOM, self.attr.name().0 as u64),
            dom_name(&DW_FORM_DOM, self.form.0 as u64),
            crate::atval::render_value_brief(self)
        )
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn cmp_value(&self, other: &dyn Value) -> CmpResult {
        match other.downcast_ref::<AttrValue>() {
            Some(that) => CmpResult::from_ord(
                (
                    ctx_key(&self.ctx),
                    self.unit,
                    self.die_offset,
                    self.attr.name().0,
                    self.doneness,
                )
                    .cmp(&(
                        ctx_key(&that.ctx),
                        that.unit,
                        that.die_offset,
                        that.attr.name().0,
                        that.doneness,
                    )),
            ),
            None => CmpResult::Fail,
        }
    }
}

/// An abbreviation table of one unit.
#[derive(Clone, Debug)]
pub struct AbbrevUnitValue {
    ctx: Arc<DwarfContext>,
    unit: usize,
    pos: usize,
}

impl AbbrevUnitValue {
    pub const VTYPE: ValueType = ValueType::new(12, "T_ABBREV_UNIT");

    pub fn new(ctx: Arc<DwarfContext>, unit: usize, pos: usize) -> Self {
        AbbrevUnitValue { ctx, unit, pos }
    }

    pub fn ctx(&self) -> &Arc<DwarfContext> {
        &self.ctx
    }

    pub fn unit(&self) -> usize {
        self.unit
    }
}

impl ValueKind for AbbrevUnitValue {
    const KIND: ValueType = AbbrevUnitValue::VTYPE;
}

impl Value for AbbrevUnitValue {
    value_impl_common!();

    fn show(&self, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
        write!(
            w,
            "abbreviation unit {:#x}",
            self.ctx.unit(self.unit).header.debug_abbrev_offset().0
        )
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn cmp_value(&self, other: &dyn Value) -> CmpResult {
        match other.downcast_ref::<AbbrevUnitValue>() {
            Some(that) => CmpResult::from_ord(
                (ctx_key(&self.ctx), self.unit).cmp(&(ctx_key(&that.ctx), that.unit)),
            ),
            None => CmpResult::Fail,
        }
    }
}

/// One abbreviation declaration.
#[derive(Clone, Debug)]
pub struct AbbrevValue {
    ctx: Arc<DwarfContext>,
    unit: usize,
    decl: AbbrevDecl,
    pos: usize,
}

impl AbbrevValue {
    pub const VTYPE: ValueType = ValueType::new(13, "T_ABBREV");

    pub fn new(ctx: Arc<DwarfContext>, unit: usize, decl: AbbrevDecl, pos: usize) -> Self {
        AbbrevValue {
            ctx,
            unit,
            decl,
            pos,
        }
    }

    pub fn ctx(&self) -> &Arc<DwarfContext> {
        &self.ctx
    }

    pub fn decl(&self) -> &AbbrevDecl {
        &self.decl
    }
}

impl ValueKind for AbbrevValue {
    const KIND: ValueType = AbbrevValue::VTYPE;
}

impl Value for AbbrevValue {
    value_impl_common!();

    fn show(&self, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
        write!(
            w,
            "[{}] {}, children:{}",
            self.decl.code,
            dom_name(&DW_TAG_DOM, self.decl.tag.0 as u64),
            if self.decl.has_children { "yes" } else { "no" }
        )
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn cmp_value(&self, other: &dyn Value) -> CmpResult {
        match other.downcast_ref::<AbbrevValue>() {
            Some(that) => CmpResult::from_ord(
                (ctx_key(&self.ctx), self.unit, self.decl.code).cmp(&(
                    ctx_key(&that.ctx),
                    that.unit,
                    that.decl.code,
                )),
            ),
            None => CmpResult::Fail,
        }
    }
}

/// One attribute specification of an abbreviation declaration.
#[derive(Clone, Debug)]
pub struct AbbrevAttrValue {
    pub name: gimli::DwAt,
    pub form: gimli::DwForm,
    pos: usize,
}

impl AbbrevAttrValue {
    pub const VTYPE: ValueType = ValueType::new(14, "T_ABBREV_ATTR");

    pub fn new(name: gimli::DwAt, form: gimli::DwForm, pos: usize) -> Self {
        AbbrevAttrValue { name, form, pos }
    }
}

impl ValueKind for AbbrevAttrValue {
    const KIND: ValueType = AbbrevAttrValue::VTYPE;
}

impl Value for AbbrevAttrValue {
    value_impl_common!();

    fn show(&self, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
        write!(
            w,
            "{} ({})",
            dom_name(&DW_AT_DOM, self.name.0 as u64),
            dom_name(&DW_FORM_DOM, self.form.0 as u64),
        )
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn cmp_value(&self, other: &dyn Value) -> CmpResult {
        match other.downcast_ref::<AbbrevAttrValue>() {
            Some(that) => CmpResult::from_ord(
                (self.name.0, self.form.0).cmp(&(that.name.0, that.form.0)),
            ),
            None => CmpResult::Fail,
        }
    }
}

/// One opcode of a location expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct LocOpRecord {
    /// Offset of the opcode within its expression.
    pub offset: u64,
    pub atom: u8,
}

/// One element of a location list: an address range with its expression.
#[derive(Clone, Debug)]
pub struct LoclistElemValue {
    ctx: Arc<DwarfContext>,
    attr_name: gimli::DwAt,
    low: u64,
    high: u64,
    ops: Rc<Vec<LocOpRecord>>,
    pos: usize,
}

impl LoclistElemValue {
    pub const VTYPE: ValueType = ValueType::new(15, "T_LOCLIST_ELEM");

    pub fn new(
        ctx: Arc<DwarfContext>,
        attr_name: gimli::DwAt,
        low: u64,
        high: u64,
        ops: Vec<LocOpRecord>,
        pos: usize,
    ) -> Self {
        LoclistElemValue {
            ctx,
            attr_name,
            low,
            high,
            ops: Rc::new(ops),
            pos,
        }
    }

    pub fn ctx(&self) -> &Arc<DwarfContext> {
        &self.ctx
    }

    pub fn attr_name(&self) -> gimli::DwAt {
        self.attr_name
    }

    pub fn low(&self) -> u64 {
        self.low
    }

    pub fn high(&self) -> u64 {
        self.high
    }

    pub fn ops(&self) -> &[LocOpRecord] {
        &self.ops
    }
}

impl ValueKind for LoclistElemValue {
    const KIND: ValueType = LoclistElemValue::VTYPE;
}

impl Value for LoclistElemValue {
    value_impl_common!();

    fn show(&self, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
        write!(w, "{:#x}..{:#x}:[", self.low, self.high)?;
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                w.write_str(", ")?;
            }
            w.write_str(&dom_name(&DW_OP_DOM, op.atom as u64))?;
        }
        w.write_str("]")
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn cmp_value(&self, other: &dyn Value) -> CmpResult {
        match other.downcast_ref::<LoclistElemValue>() {
            Some(that) => CmpResult::from_ord(
                (ctx_key(&self.ctx), self.low, self.high, &*self.ops).cmp(&(
                    ctx_key(&that.ctx),
                    that.low,
                    that.high,
                    &*that.ops,
                )),
            ),
            None => CmpResult::Fail,
        }
    }
}

/// A single location expression opcode.
#[derive(Clone, Debug)]
pub struct LoclistOpValue {
    ctx: Arc<DwarfContext>,
    op: LocOpRecord,
    pos: usize,
}

impl LoclistOpValue {
    pub const VTYPE: ValueType = ValueType::new(16, "T_LOCLIST_OP");

    pub fn new(ctx: Arc<DwarfContext>, op: LocOpRecord, pos: usize) -> Self {
        LoclistOpValue { ctx, op, pos }
    }

    pub fn op(&self) -> LocOpRecord {
        self.op
    }
}

impl ValueKind for LoclistOpValue {
    const KIND: ValueType = LoclistOpValue::VTYPE;
}

impl Value for LoclistOpValue {
    value_impl_common!();

    fn show(&self, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
        write!(
            w,
            "{}:{}",
            self.op.offset,
            dom_name(&DW_OP_DOM, self.op.atom as u64)
        )
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn cmp_value(&self, other: &dyn Value) -> CmpResult {
        match other.downcast_ref::<LoclistOpValue>() {
            Some(that) => CmpResult::from_ord(
                (ctx_key(&self.ctx), self.op).cmp(&(ctx_key(&that.ctx), that.op)),
            ),
            None => CmpResult::Fail,
        }
    }
}

/// A set of addresses.
#[derive(Clone, Debug)]
pub struct AsetValue {
    cov: Coverage,
    pos: usize,
}

impl AsetValue {
    pub const VTYPE: ValueType = ValueType::new(17, "T_ASET");

    pub fn new(cov: Coverage, pos: usize) -> Self {
        AsetValue { cov, pos }
    }

    pub fn coverage(&self) -> &Coverage {
        &self.cov
    }
}

impl ValueKind for AsetValue {
    const KIND: ValueType = AsetValue::VTYPE;
}

impl Value for AsetValue {
    value_impl_common!();

    fn show(&self, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
        for (i, (b, e)) in self.cov.ranges().enumerate() {
            if i > 0 {
                w.write_str(", ")?;
            }
            write!(w, "[{b:#x}, {e:#x})")?;
        }
        if self.cov.is_empty() {
            w.write_str("[)")?;
        }
        Ok(())
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn cmp_value(&self, other: &dyn Value) -> CmpResult {
        match other.downcast_ref::<AsetValue>() {
            Some(that) => CmpResult::from_ord(self.cov.cmp(&that.cov)),
            None => CmpResult::Fail,
        }
    }
}

/// An ELF symbol table entry.
#[derive(Clone, Debug)]
pub struct SymbolValue {
    ctx: Arc<DwarfContext>,
    index: usize,
    doneness: Doneness,
    pos: usize,
}

impl SymbolValue {
    pub const VTYPE: ValueType = ValueType::new(18, "T_ELFSYM");

    pub fn new(ctx: Arc<DwarfContext>, index: usize, doneness: Doneness, pos: usize) -> Self {
        SymbolValue {
            ctx,
            index,
            doneness,
            pos,
        }
    }

    pub fn ctx(&self) -> &Arc<DwarfContext> {
        &self.ctx
    }

    pub fn record(&self) -> &crate::context::SymbolRecord {
        &self.ctx.symbols()[self.index]
    }

    pub fn doneness(&self) -> Doneness {
        self.doneness
    }

    pub fn with_doneness(&self, doneness: Doneness) -> Self {
        SymbolValue {
            doneness,
            ..self.clone()
        }
    }
}

impl ValueKind for SymbolValue {
    const KIND: ValueType = SymbolValue::VTYPE;
}

impl Value for SymbolValue {
    value_impl_common!();

    fn show(&self, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
        let rec = self.record();
        if rec.name.is_empty() {
            write!(w, "{:#x} <symbol {}>", rec.value, rec.index)
        } else {
            write!(w, "{:#x} {}", rec.value, rec.name)
        }
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn cmp_value(&self, other: &dyn Value) -> CmpResult {
        match other.downcast_ref::<SymbolValue>() {
            Some(that) => CmpResult::from_ord(
                (ctx_key(&self.ctx), self.index, self.doneness).cmp(&(
                    ctx_key(&that.ctx),
                    that.index,
                    that.doneness,
                )),
            ),
            None => CmpResult::Fail,
        }
    }
}

/// The ELF container of a DWARF file.
#[derive(Clone, Debug)]
pub struct ElfValue {
    ctx: Arc<DwarfContext>,
    pos: usize,
}

impl ElfValue {
    pub const VTYPE: ValueType = ValueType::new(19, "T_ELF");

    pub fn new(ctx: Arc<DwarfContext>, pos: usize) -> Self {
        ElfValue { ctx, pos }
    }

    pub fn ctx(&self) -> &Arc<DwarfContext> {
        &self.ctx
    }
}

impl ValueKind for ElfValue {
    const KIND: ValueType = ElfValue::VTYPE;
}

impl Value for ElfValue {
    value_impl_common!();

    fn show(&self, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
        write!(w, "<Elf \"{}\">", self.ctx.path())
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn cmp_value(&self, other: &dyn Value) -> CmpResult {
        match other.downcast_ref::<ElfValue>() {
            Some(that) => {
                CmpResult::from_ord(ctx_key(&self.ctx).cmp(&ctx_key(&that.ctx)))
            }
            None => CmpResult::Fail,
        }
    }
}

/// An ELF section.
#[derive(Clone, Debug)]
pub struct ElfSectionValue {
    ctx: Arc<DwarfContext>,
    index: usize,
    pos: usize,
}

impl ElfSectionValue {
    pub const VTYPE: ValueType = ValueType::new(20, "T_ELFSCN");

    pub fn new(ctx: Arc<DwarfContext>, index: usize, pos: usize) -> Self {
        ElfSectionValue { ctx, index, pos }
    }

    pub fn ctx(&self) -> &Arc<DwarfContext> {
        &self.ctx
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn record(&self) -> &crate::context::SectionRecord {
        &self.ctx.sections()[self.index]
    }
}

impl ValueKind for ElfSectionValue {
    const KIND: ValueType = ElfSectionValue::VTYPE;
}

impl Value for ElfSectionValue {
    value_impl_common!();

    fn show(&self, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
        let rec = self.record();
        if rec.name.is_empty() {
            write!(w, "<section {}>", rec.index)
        } else {
            w.write_str(&rec.name)
        }
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn cmp_value(&self, other: &dyn Value) -> CmpResult {
        match other.downcast_ref::<ElfSectionValue>() {
            Some(that) => CmpResult::from_ord(
                (ctx_key(&self.ctx), self.index).cmp(&(ctx_key(&that.ctx), that.index)),
            ),
            None => CmpResult::Fail,
        }
    }
}

/// One relocation record.
#[derive(Clone, Debug)]
pub struct RelocationValue {
    ctx: Arc<DwarfContext>,
    index: usize,
    pos: usize,
}

impl RelocationValue {
    pub const VTYPE: ValueType = ValueType::new(21, "T_ELFREL");

    pub fn new(ctx: Arc<DwarfContext>, index: usize, pos: usize) -> Self {
        RelocationValue { ctx, index, pos }
    }

    pub fn ctx(&self) -> &Arc<DwarfContext> {
        &self.ctx
    }

    pub fn record(&self) -> &crate::context::RelocRecord {
        &self.ctx.relocations()[self.index]
    }
}

impl ValueKind for RelocationValue {
    const KIND: ValueType = RelocationValue::VTYPE;
}

impl Value for RelocationValue {
    value_impl_common!();

    fn show(&self, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
        let rec = self.record();
        write!(w, "{:#x} type {}", rec.offset, rec.rtype)?;
        if let Some(sym) = self.ctx.symbols().get(rec.sym_index) {
            if !sym.name.is_empty() {
                write!(w, " {}", sym.name)?;
            }
        }
        Ok(())
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn cmp_value(&self, other: &dyn Value) -> CmpResult {
        match other.downcast_ref::<RelocationValue>() {
            Some(that) => CmpResult::from_ord(
                (ctx_key(&self.ctx), self.index).cmp(&(ctx_key(&that.ctx), that.index)),
            ),
            None => CmpResult::Fail,
        }
    }
}
