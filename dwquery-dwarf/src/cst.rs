//! Constant domains for DWARF and ELF enumerations.
//!
//! Enumeration domains print their members symbolically (via gimli's
//! constant tables) and compare only within themselves. Address and offset
//! domains are numeric: they print in hex and mix with plain literals.

use std::fmt;

use dwquery_lang::cst::ConstantDom;
use dwquery_lang::value::Brevity;

/// A numeric domain printing in hexadecimal.
pub struct HexNumDom {
    name: &'static str,
}

impl ConstantDom for HexNumDom {
    fn show(&self, value: i128, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
        if value < 0 {
            write!(w, "-0x{:x}", value.unsigned_abs())
        } else {
            write!(w, "0x{value:x}")
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn safe_arith(&self) -> bool {
        true
    }
}

pub static ADDRESS_DOM: HexNumDom = HexNumDom { name: "address" };
pub static OFFSET_DOM: HexNumDom = HexNumDom { name: "offset" };

/// An enumeration domain backed by a symbolic name lookup.
pub struct EnumDom {
    name: &'static str,
    lookup: fn(u64) -> Option<&'static str>,
}

impl ConstantDom for EnumDom {
    fn show(&self, value: i128, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
        match u64::try_from(value).ok().and_then(|v| (self.lookup)(v)) {
            Some(name) => w.write_str(name),
            None => write!(w, "{value:#x}"),
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

impl EnumDom {
    /// The symbolic name of a member, if it is known.
    pub fn member_name(&self, value: u64) -> Option<&'static str> {
        (self.lookup)(value)
    }
}

macro_rules! gimli_dom {
    ($dom:ident, $dom_name:literal, $ty:ident, $code:ty) => {
        pub static $dom: EnumDom = EnumDom {
            name: $dom_name,
            lookup: |v| {
                <$code>::try_from(v)
                    .ok()
                    .and_then(|v| gimli::$ty(v).static_string())
            },
        };
    };
}

gimli_dom!(DW_TAG_DOM, "DW_TAG_", DwTag, u16);
gimli_dom!(DW_AT_DOM, "DW_AT_", DwAt, u16);
gimli_dom!(DW_FORM_DOM, "DW_FORM_", DwForm, u16);
gimli_dom!(DW_LANG_DOM, "DW_LANG_", DwLang, u16);
gimli_dom!(DW_INL_DOM, "DW_INL_", DwInl, u8);
gimli_dom!(DW_ATE_DOM, "DW_ATE_", DwAte, u8);
gimli_dom!(DW_ACCESS_DOM, "DW_ACCESS_", DwAccess, u8);
gimli_dom!(DW_VIS_DOM, "DW_VIS_", DwVis, u8);
gimli_dom!(DW_VIRTUALITY_DOM, "DW_VIRTUALITY_", DwVirtuality, u8);
gimli_dom!(DW_ID_DOM, "DW_ID_", DwId, u8);
gimli_dom!(DW_CC_DOM, "DW_CC_", DwCc, u8);
gimli_dom!(DW_ORD_DOM, "DW_ORD_", DwOrd, u8);
gimli_dom!(DW_DSC_DOM, "DW_DSC_", DwDsc, u8);
gimli_dom!(DW_DS_DOM, "DW_DS_", DwDs, u8);
gimli_dom!(DW_END_DOM, "DW_END_", DwEnd, u8);
gimli_dom!(DW_ADDR_DOM, "DW_ADDR_", DwAddr, u64);
gimli_dom!(DW_OP_DOM, "DW_OP_", DwOp, u8);

fn stt_name(v: u64) -> Option<&'static str> {
    Some(match v {
        0 => "STT_NOTYPE",
        1 => "STT_OBJECT",
        2 => "STT_FUNC",
        3 => "STT_SECTION",
        4 => "STT_FILE",
        5 => "STT_COMMON",
        6 => "STT_TLS",
        10 => "STT_GNU_IFUNC",
        _ => return None,
    })
}

fn stb_name(v: u64) -> Option<&'static str> {
    Some(match v {
        0 => "STB_LOCAL",
        1 => "STB_GLOBAL",
        2 => "STB_WEAK",
        10 => "STB_GNU_UNIQUE",
        _ => return None,
    })
}

fn stv_name(v: u64) -> Option<&'static str> {
    Some(match v {
        0 => "STV_DEFAULT",
        1 => "STV_INTERNAL",
        2 => "STV_HIDDEN",
        3 => "STV_PROTECTED",
        _ => return None,
    })
}

fn sht_name(v: u64) -> Option<&'static str> {
    Some(match v {
        0 => "SHT_NULL",
        1 => "SHT_PROGBITS",
        2 => "SHT_SYMTAB",
        3 => "SHT_STRTAB",
        4 => "SHT_RELA",
        5 => "SHT_HASH",
        6 => "SHT_DYNAMIC",
        7 => "SHT_NOTE",
        8 => "SHT_NOBITS",
        9 => "SHT_REL",
        11 => "SHT_DYNSYM",
        14 => "SHT_INIT_ARRAY",
        15 => "SHT_FINI_ARRAY",
        16 => "SHT_PREINIT_ARRAY",
        17 => "SHT_GROUP",
        18 => "SHT_SYMTAB_SHNDX",
        0x6ffffff5 => "SHT_GNU_ATTRIBUTES",
        0x6ffffff6 => "SHT_GNU_HASH",
        0x6ffffffd => "SHT_GNU_verdef",
        0x6ffffffe => "SHT_GNU_verneed",
        0x6fffffff => "SHT_GNU_versym",
        _ => return None,
    })
}

pub static STT_DOM: EnumDom = EnumDom {
    name: "STT_",
    lookup: stt_name,
};

pub static STB_DOM: EnumDom = EnumDom {
    name: "STB_",
    lookup: stb_name,
};

pub static STV_DOM: EnumDom = EnumDom {
    name: "STV_",
    lookup: stv_name,
};

pub static SHT_DOM: EnumDom = EnumDom {
    name: "SHT_",
    lookup: sht_name,
};

/// The DWARF tags that get `?TAG_*` assertion words and named constants.
pub const KNOWN_TAGS: &[gimli::DwTag] = &[
    gimli::DW_TAG_array_type,
    gimli::DW_TAG_class_type,
    gimli::DW_TAG_entry_point,
    gimli::DW_TAG_enumeration_type,
    gimli::DW_TAG_formal_parameter,
    gimli::DW_TAG_imported_declaration,
    gimli::DW_TAG_label,
    gimli::DW_TAG_lexical_block,
    gimli::DW_TAG_member,
    gimli::DW_TAG_pointer_type,
    gimli::DW_TAG_reference_type,
    gimli::DW_TAG_compile_unit,
    gimli::DW_TAG_string_type,
    gimli::DW_TAG_structure_type,
    gimli::DW_TAG_subroutine_type,
    gimli::DW_TAG_typedef,
    gimli::DW_TAG_union_type,
    gimli::DW_TAG_unspecified_parameters,
    gimli::DW_TAG_variant,
    gimli::DW_TAG_common_block,
    gimli::DW_TAG_common_inclusion,
    gimli::DW_TAG_inheritance,
    gimli::DW_TAG_inlined_subroutine,
    gimli::DW_TAG_module,
    gimli::DW_TAG_ptr_to_member_type,
    gimli::DW_TAG_set_type,
    gimli::DW_TAG_subrange_type,
    gimli::DW_TAG_with_stmt,
    gimli::DW_TAG_access_declaration,
    gimli::DW_TAG_base_type,
    gimli::DW_TAG_catch_block,
    gimli::DW_TAG_const_type,
    gimli::DW_TAG_constant,
    gimli::DW_TAG_enumerator,
    gimli::DW_TAG_file_type,
    gimli::DW_TAG_friend,
    gimli::DW_TAG_namelist,
    gimli::DW_TAG_namelist_item,
    gimli::DW_TAG_packed_type,
    gimli::DW_TAG_subprogram,
    gimli::DW_TAG_template_type_parameter,
    gimli::DW_TAG_template_value_parameter,
    gimli::DW_TAG_thrown_type,
    gimli::DW_TAG_try_block,
    gimli::DW_TAG_variant_part,
    gimli::DW_TAG_variable,
    gimli::DW_TAG_volatile_type,
    gimli::DW_TAG_dwarf_procedure,
    gimli::DW_TAG_restrict_type,
    gimli::DW_TAG_interface_type,
    gimli::DW_TAG_namespace,
    gimli::DW_TAG_imported_module,
    gimli::DW_TAG_unspecified_type,
    gimli::DW_TAG_partial_unit,
    gimli::DW_TAG_imported_unit,
    gimli::DW_TAG_condition,
    gimli::DW_TAG_shared_type,
    gimli::DW_TAG_type_unit,
    gimli::DW_TAG_rvalue_reference_type,
    gimli::DW_TAG_template_alias,
    gimli::DW_TAG_coarray_type,
    gimli::DW_TAG_generic_subrange,
    gimli::DW_TAG_dynamic_type,
    gimli::DW_TAG_atomic_type,
    gimli::DW_TAG_call_site,
    gimli::DW_TAG_call_site_parameter,
    gimli::DW_TAG_skeleton_unit,
    gimli::DW_TAG_immutable_type,
    gimli::DW_TAG_GNU_call_site,
    gimli::DW_TAG_GNU_call_site_parameter,
];

/// The DWARF attributes that get `@AT_*` / `?AT_*` words and named
/// constants.
pub const KNOWN_ATTRS: &[gimli::DwAt] = &[
    gimli::DW_AT_sibling,
    gimli::DW_AT_location,
    gimli::DW_AT_name,
    gimli::DW_AT_ordering,
    gimli::DW_AT_byte_size,
    gimli::DW_AT_bit_offset,
    gimli::DW_AT_bit_size,
    gimli::DW_AT_stmt_list,
    gimli::DW_AT_low_pc,
    gimli::DW_AT_high_pc,
    gimli::DW_AT_language,
    gimli::DW_AT_discr,
    gimli::DW_AT_discr_value,
    gimli::DW_AT_visibility,
    gimli::DW_AT_import,
    gimli::DW_AT_string_length,
    gimli::DW_AT_common_reference,
    gimli::DW_AT_comp_dir,
    gimli::DW_AT_const_value,
    gimli::DW_AT_containing_type,
    gimli::DW_AT_default_value,
    gimli::DW_AT_inline,
    gimli::DW_AT_is_optional,
    gimli::DW_AT_lower_bound,
    gimli::DW_AT_producer,
    gimli::DW_AT_prototyped,
    gimli::DW_AT_return_addr,
    gimli::DW_AT_start_scope,
    gimli::DW_AT_bit_stride,
    gimli::DW_AT_upper_bound,
    gimli::DW_AT_abstract_origin,
    gimli::DW_AT_accessibility,
    gimli::DW_AT_address_class,
    gimli::DW_AT_artificial,
    gimli::DW_AT_base_types,
    gimli::DW_AT_calling_convention,
    gimli::DW_AT_count,
    gimli::DW_AT_data_member_location,
    gimli::DW_AT_decl_column,
    gimli::DW_AT_decl_file,
    gimli::DW_AT_decl_line,
    gimli::DW_AT_declaration,
    gimli::DW_AT_discr_list,
    gimli::DW_AT_encoding,
    gimli::DW_AT_external,
    gimli::DW_AT_frame_base,
    gimli::DW_AT_friend,
    gimli::DW_AT_identifier_case,
    gimli::DW_AT_macro_info,
    gimli::DW_AT_namelist_item,
    gimli::DW_AT_priority,
    gimli::DW_AT_segment,
    gimli::DW_AT_specification,
    gimli::DW_AT_static_link,
    gimli::DW_AT_type,
    gimli::DW_AT_use_location,
    gimli::DW_AT_variable_parameter,
    gimli::DW_AT_virtuality,
    gimli::DW_AT_vtable_elem_location,
    gimli::DW_AT_allocated,
    gimli::DW_AT_associated,
    gimli::DW_AT_data_location,
    gimli::DW_AT_byte_stride,
    gimli::DW_AT_entry_pc,
    gimli::DW_AT_use_UTF8,
    gimli::DW_AT_extension,
    gimli::DW_AT_ranges,
    gimli::DW_AT_trampoline,
    gimli::DW_AT_call_column,
    gimli::DW_AT_call_file,
    gimli::DW_AT_call_line,
    gimli::DW_AT_description,
    gimli::DW_AT_binary_scale,
    gimli::DW_AT_decimal_scale,
    gimli::DW_AT_small,
    gimli::DW_AT_decimal_sign,
    gimli::DW_AT_digit_count,
    gimli::DW_AT_picture_string,
    gimli::DW_AT_mutable,
    gimli::DW_AT_threads_scaled,
    gimli::DW_AT_explicit,
    gimli::DW_AT_object_pointer,
    gimli::DW_AT_endianity,
    gimli::DW_AT_elemental,
    gimli::DW_AT_pure,
    gimli::DW_AT_recursive,
    gimli::DW_AT_signature,
    gimli::DW_AT_main_subprogram,
    gimli::DW_AT_data_bit_offset,
    gimli::DW_AT_const_expr,
    gimli::DW_AT_enum_class,
    gimli::DW_AT_linkage_name,
    gimli::DW_AT_noreturn,
    gimli::DW_AT_alignment,
    gimli::DW_AT_deleted,
    gimli::DW_AT_defaulted,
    gimli::DW_AT_MIPS_linkage_name,
    gimli::DW_AT_GNU_all_call_sites,
    gimli::DW_AT_GNU_all_tail_call_sites,
];

/// Enumeration members registered as named vocabulary constants, beyond
/// tags and attributes.
pub fn enum_constants() -> Vec<(&'static EnumDom, u64, &'static str)> {
    let mut out: Vec<(&'static EnumDom, u64, &'static str)> = Vec::new();

    let ates = [
        gimli::DW_ATE_address,
        gimli::DW_ATE_boolean,
        gimli::DW_ATE_complex_float,
        gimli::DW_ATE_float,
        gimli::DW_ATE_signed,
        gimli::DW_ATE_signed_char,
        gimli::DW_ATE_unsigned,
        gimli::DW_ATE_unsigned_char,
        gimli::DW_ATE_imaginary_float,
        gimli::DW_ATE_packed_decimal,
        gimli::DW_ATE_numeric_string,
        gimli::DW_ATE_edited,
        gimli::DW_ATE_signed_fixed,
        gimli::DW_ATE_unsigned_fixed,
        gimli::DW_ATE_decimal_float,
        gimli::DW_ATE_UTF,
        gimli::DW_ATE_UCS,
        gimli::DW_ATE_ASCII,
    ];
    for ate in ates {
        if let Some(name) = ate.static_string() {
            out.push((&DW_ATE_DOM, ate.0 as u64, name));
        }
    }

    let langs = [
        gimli::DW_LANG_C89,
        gimli::DW_LANG_C,
        gimli::DW_LANG_Ada83,
        gimli::DW_LANG_C_plus_plus,
        gimli::DW_LANG_Cobol74,
        gimli::DW_LANG_Cobol85,
        gimli::DW_LANG_Fortran77,
        gimli::DW_LANG_Fortran90,
        gimli::DW_LANG_Pascal83,
        gimli::DW_LANG_Modula2,
        gimli::DW_LANG_Java,
        gimli::DW_LANG_C99,
        gimli::DW_LANG_Ada95,
        gimli::DW_LANG_Fortran95,
        gimli::DW_LANG_PLI,
        gimli::DW_LANG_ObjC,
        gimli::DW_LANG_ObjC_plus_plus,
        gimli::DW_LANG_UPC,
        gimli::DW_LANG_D,
        gimli::DW_LANG_Python,
        gimli::DW_LANG_Go,
        gimli::DW_LANG_Haskell,
        gimli::DW_LANG_C_plus_plus_03,
        gimli::DW_LANG_C_plus_plus_11,
        gimli::DW_LANG_OCaml,
        gimli::DW_LANG_Rust,
        gimli::DW_LANG_C11,
        gimli::DW_LANG_Swift,
        gimli::DW_LANG_C_plus_plus_14,
        gimli::DW_LANG_Fortran03,
        gimli::DW_LANG_Fortran08,
    ];
    for lang in langs {
        if let Some(name) = lang.static_string() {
            out.push((&DW_LANG_DOM, lang.0 as u64, name));
        }
    }

    let inls = [
        gimli::DW_INL_not_inlined,
        gimli::DW_INL_inlined,
        gimli::DW_INL_declared_not_inlined,
        gimli::DW_INL_declared_inlined,
    ];
    for inl in inls {
        if let Some(name) = inl.static_string() {
            out.push((&DW_INL_DOM, inl.0 as u64, name));
        }
    }

    let accesses = [
        gimli::DW_ACCESS_public,
        gimli::DW_ACCESS_protected,
        gimli::DW_ACCESS_private,
    ];
    for access in accesses {
        if let Some(name) = access.static_string() {
            out.push((&DW_ACCESS_DOM, access.0 as u64, name));
        }
    }

    let virtualities = [
        gimli::DW_VIRTUALITY_none,
        gimli::DW_VIRTUALITY_virtual,
        gimli::DW_VIRTUALITY_pure_virtual,
    ];
    for virtuality in virtualities {
        if let Some(name) = virtuality.static_string() {
            out.push((&DW_VIRTUALITY_DOM, virtuality.0 as u64, name));
        }
    }

    let forms = [
        gimli::DW_FORM_addr,
        gimli::DW_FORM_block2,
        gimli::DW_FORM_block4,
        gimli::DW_FORM_data2,
        gimli::DW_FORM_data4,
        gimli::DW_FORM_data8,
        gimli::DW_FORM_string,
        gimli::DW_FORM_block,
        gimli::DW_FORM_block1,
        gimli::DW_FORM_data1,
        gimli::DW_FORM_flag,
        gimli::DW_FORM_sdata,
        gimli::DW_FORM_strp,
        gimli::DW_FORM_udata,
        gimli::DW_FORM_ref_addr,
        gimli::DW_FORM_ref1,
        gimli::DW_FORM_ref2,
        gimli::DW_FORM_ref4,
        gimli::DW_FORM_ref8,
        gimli::DW_FORM_ref_udata,
        gimli::DW_FORM_indirect,
        gimli::DW_FORM_sec_offset,
        gimli::DW_FORM_exprloc,
        gimli::DW_FORM_flag_present,
        gimli::DW_FORM_strx,
        gimli::DW_FORM_addrx,
        gimli::DW_FORM_ref_sup4,
        gimli::DW_FORM_strp_sup,
        gimli::DW_FORM_data16,
        gimli::DW_FORM_line_strp,
        gimli::DW_FORM_ref_sig8,
        gimli::DW_FORM_implicit_const,
        gimli::DW_FORM_loclistx,
        gimli::DW_FORM_rnglistx,
        gimli::DW_FORM_ref_sup8,
    ];
    for form in forms {
        if let Some(name) = form.static_string() {
            out.push((&DW_FORM_DOM, form.0 as u64, name));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwquery_lang::cst::{constants_comparable, Constant, DEC_DOM};

    fn shown(cst: Constant) -> String {
        format!("{cst}")
    }

    #[test]
    fn enumeration_display() {
        let tag = Constant::new(gimli::DW_TAG_compile_unit.0 as i128, &DW_TAG_DOM);
        assert_eq!(shown(tag), "DW_TAG_compile_unit");

        let at = Constant::new(gimli::DW_AT_name.0 as i128, &DW_AT_DOM);
        assert_eq!(shown(at), "DW_AT_name");

        // Unknown members fall back to hex.
        let odd = Constant::new(0xfff0, &DW_TAG_DOM);
        assert_eq!(shown(odd), "0xfff0");
    }

    #[test]
    fn enumeration_comparability() {
        let tag = Constant::new(0x11, &DW_TAG_DOM);
        let at = Constant::new(0x11, &DW_AT_DOM);
        let num = Constant::new(0x11, &DEC_DOM);

        assert!(constants_comparable(&tag, &tag));
        assert!(!constants_comparable(&tag, &at));
        assert!(!constants_comparable(&tag, &num));

        // Addresses are numeric and mix with plain literals.
        let addr = Constant::new(0x11, &ADDRESS_DOM);
        assert!(constants_comparable(&addr, &num));
        assert_eq!(shown(addr), "0x11");
    }
}

