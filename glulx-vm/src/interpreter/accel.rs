//! Accelerated library functions.
//!
//! Games may ask the machine to replace well-known veneer functions with
//! native implementations. The object-table layout those functions walk
//! is described by nine parameters set through `accelparam`; functions
//! 2–7 assume the classic layout with seven attribute bytes, 8–13 read
//! the attribute-byte count from parameter 7.

use std::collections::HashMap;

use glulx_isa::{glk as glksel, Fault};

use super::search;
use super::stream::IoSys;
use super::Interpreter;
use crate::error::SimpleResult;
use crate::glk::GlkDispatch;
use crate::strings::object_kind;

/// Registered accelerations and the object-layout parameters.
#[derive(Debug, Clone, Default)]
pub(crate) struct Accel {
    funcs: HashMap<u32, u32>,
    params: [u32; 9],
}

/// Parameter indices, as assigned to `accelparam`.
const P_CLASSES_TABLE: usize = 0;
const P_INDIV_PROP_START: usize = 1;
const P_CLASS_METACLASS: usize = 2;
const P_OBJECT_METACLASS: usize = 3;
const P_ROUTINE_METACLASS: usize = 4;
const P_STRING_METACLASS: usize = 5;
const P_SELF: usize = 6;
const P_NUM_ATTR_BYTES: usize = 7;
const P_CPV_START: usize = 8;

impl Accel {
    /// Acceleration id bound to `addr`, if any.
    pub(crate) fn func_at(&self, addr: u32) -> Option<u32> {
        self.funcs.get(&addr).copied()
    }

    /// Whether `id` names an implemented acceleration.
    pub(crate) fn supported(id: u32) -> bool {
        (1..=13).contains(&id)
    }

    /// Record a layout parameter; indices past the table are ignored.
    pub(crate) fn set_param(&mut self, index: u32, value: u32) {
        if let Some(slot) = self.params.get_mut(index as usize) {
            *slot = value;
        }
    }
}

/// Field offsets of an object body, parameterized by the attribute-byte
/// count.
#[derive(Debug, Clone, Copy)]
struct ObjLayout {
    in_class_off: u32,
    props_off: u32,
}

impl ObjLayout {
    /// The classic veneer layout: seven attribute bytes.
    const fn classic() -> Self {
        Self {
            in_class_off: 13,
            props_off: 16,
        }
    }

    /// Layout with `num_attr_bytes` attribute bytes.
    const fn parameterized(num_attr_bytes: u32) -> Self {
        Self {
            in_class_off: 1 + num_attr_bytes + 5,
            props_off: 1 + num_attr_bytes + 8,
        }
    }
}

impl<G: GlkDispatch> Interpreter<G> {
    /// `accelfunc`: bind (or, with id zero, unbind) an acceleration to a
    /// function address. Unknown ids leave the function interpreted.
    pub(crate) fn op_accelfunc(&mut self, id: u32, addr: u32) -> SimpleResult<()> {
        if !object_kind(&self.mem, addr)?.is_function() {
            return Err(Fault::AccelNotAFunction);
        }
        if id == 0 {
            self.accel.funcs.remove(&addr);
        } else if Accel::supported(id) {
            self.accel.funcs.insert(addr, id);
        }
        Ok(())
    }

    /// `accelparam`.
    pub(crate) fn op_accelparam(&mut self, index: u32, value: u32) {
        self.accel.set_param(index, value);
    }

    /// Run acceleration `id` in place of the function it replaced.
    pub(crate) fn run_accel(&mut self, id: u32, args: &[u32]) -> SimpleResult<u32> {
        let a0 = args.first().copied().unwrap_or(0);
        let a1 = args.get(1).copied().unwrap_or(0);
        let classic = ObjLayout::classic();
        let new = ObjLayout::parameterized(self.accel.params[P_NUM_ATTR_BYTES]);
        match id {
            1 => self.accel_z_region(a0),
            2 => self.accel_cp_tab(a0, a1, classic),
            3 => self.accel_ra_pr(a0, a1, classic),
            4 => self.accel_rl_pr(a0, a1, classic),
            5 => self.accel_oc_cl(a0, a1, classic),
            6 => self.accel_rv_pr(a0, a1, classic),
            7 => self.accel_op_pr(a0, a1, classic),
            8 => self.accel_cp_tab(a0, a1, new),
            9 => self.accel_ra_pr(a0, a1, new),
            10 => self.accel_rl_pr(a0, a1, new),
            11 => self.accel_oc_cl(a0, a1, new),
            12 => self.accel_rv_pr(a0, a1, new),
            13 => self.accel_op_pr(a0, a1, new),
            _ => Ok(0),
        }
    }

    /// Report a veneer misuse the way the library functions do: as a
    /// printed complaint, not a machine fault.
    fn accel_warning(&mut self, msg: &str) {
        tracing::warn!(msg, "accelerated function misuse");
        if self.iosys == IoSys::Glk {
            for byte in msg.bytes() {
                self.dispatch_glk(glksel::PUT_CHAR, &[byte as u32]);
            }
            self.dispatch_glk(glksel::PUT_CHAR, &[u32::from(b'\n')]);
        }
    }

    /// `Z__Region`: 1 for objects, 2 for functions, 3 for strings.
    fn accel_z_region(&mut self, addr: u32) -> SimpleResult<u32> {
        if addr < 36 || addr >= self.mem.endmem() {
            return Ok(0);
        }
        let tb = self.mem.read_byte(addr)?;
        Ok(if tb >= 0xE0 {
            3
        } else if tb >= 0xC0 {
            2
        } else if (0x70..=0x7E).contains(&tb) && addr >= self.mem.ramstart() {
            1
        } else {
            0
        })
    }

    fn accel_obj_in_class(&self, obj: u32, layout: ObjLayout) -> SimpleResult<bool> {
        let field = self.mem.read_word(obj.wrapping_add(layout.in_class_off))?;
        Ok(field == self.accel.params[P_CLASS_METACLASS])
    }

    /// `CP__Tab`: find a common-property record by binary search.
    fn accel_cp_tab(&mut self, obj: u32, id: u32, layout: ObjLayout) -> SimpleResult<u32> {
        if self.accel_z_region(obj)? != 1 {
            self.accel_warning("[** Programming error: tried to find the \".\" of (something) **]");
            return Ok(0);
        }
        let otab = self.mem.read_word(obj.wrapping_add(layout.props_off))?;
        if otab == 0 {
            return Ok(0);
        }
        let max = self.mem.read_word(otab)?;
        let key = (id as u16).to_be_bytes();
        search::binary(
            &self.mem,
            &key,
            otab.wrapping_add(4),
            10,
            max,
            0,
            glulx_isa::SearchOptions::empty(),
        )
    }

    /// Shared property lookup of `RA__Pr`/`RL__Pr`/`RV__Pr`.
    fn accel_get_prop(&mut self, obj: u32, id: u32, layout: ObjLayout) -> SimpleResult<u32> {
        let mut obj = obj;
        let mut id = id;
        let mut cla = 0u32;
        if id & 0xFFFF_0000 != 0 {
            cla = self
                .mem
                .read_word(self.accel.params[P_CLASSES_TABLE].wrapping_add(4u32.wrapping_mul(id & 0xFFFF)))?;
            if self.accel_oc_cl(obj, cla, layout)? == 0 {
                return Ok(0);
            }
            id >>= 16;
            obj = cla;
        }
        let prop = self.accel_cp_tab(obj, id, layout)?;
        if prop == 0 {
            return Ok(0);
        }
        let indiv = self.accel.params[P_INDIV_PROP_START];
        if self.accel_obj_in_class(obj, layout)? && cla == 0 && !(indiv..indiv + 8).contains(&id) {
            return Ok(0);
        }
        // properties flagged private are visible to self only
        if self.mem.read_word(self.accel.params[P_SELF])? != obj
            && self.mem.read_byte(prop.wrapping_add(9))? & 1 != 0
        {
            return Ok(0);
        }
        Ok(prop)
    }

    /// `RA__Pr`: property data address, or zero.
    fn accel_ra_pr(&mut self, obj: u32, id: u32, layout: ObjLayout) -> SimpleResult<u32> {
        let prop = self.accel_get_prop(obj, id, layout)?;
        if prop == 0 {
            return Ok(0);
        }
        self.mem.read_word(prop.wrapping_add(4))
    }

    /// `RL__Pr`: property data length in bytes.
    fn accel_rl_pr(&mut self, obj: u32, id: u32, layout: ObjLayout) -> SimpleResult<u32> {
        let prop = self.accel_get_prop(obj, id, layout)?;
        if prop == 0 {
            return Ok(0);
        }
        Ok(4u32.wrapping_mul(self.mem.read_short(prop.wrapping_add(2))? as u32))
    }

    /// `OC__Cl`: class membership.
    fn accel_oc_cl(&mut self, obj: u32, cla: u32, layout: ObjLayout) -> SimpleResult<u32> {
        let params = self.accel.params;
        let zr = self.accel_z_region(obj)?;
        if zr == 3 {
            return Ok((cla == params[P_STRING_METACLASS]) as u32);
        }
        if zr == 2 {
            return Ok((cla == params[P_ROUTINE_METACLASS]) as u32);
        }
        if zr != 1 {
            return Ok(0);
        }
        let metaclasses = [
            params[P_CLASS_METACLASS],
            params[P_OBJECT_METACLASS],
            params[P_ROUTINE_METACLASS],
            params[P_STRING_METACLASS],
        ];
        if cla == params[P_CLASS_METACLASS] {
            let yes = self.accel_obj_in_class(obj, layout)? || metaclasses.contains(&obj);
            return Ok(yes as u32);
        }
        if cla == params[P_OBJECT_METACLASS] {
            let no = self.accel_obj_in_class(obj, layout)? || metaclasses.contains(&obj);
            return Ok(!no as u32);
        }
        if cla == params[P_ROUTINE_METACLASS] || cla == params[P_STRING_METACLASS] {
            return Ok(0);
        }
        if !self.accel_obj_in_class(cla, layout)? {
            self.accel_warning(
                "[** Programming error: tried to apply 'ofclass' with non-class **]",
            );
            return Ok(0);
        }
        // walk the inheritance list in common property 2
        let prop = self.accel_get_prop(obj, 2, layout)?;
        if prop == 0 {
            return Ok(0);
        }
        let list = self.mem.read_word(prop.wrapping_add(4))?;
        let len = self.mem.read_short(prop.wrapping_add(2))? as u32;
        for i in 0..len {
            if self.mem.read_word(list.wrapping_add(4 * i))? == cla {
                return Ok(1);
            }
        }
        Ok(0)
    }

    /// `RV__Pr`: property value, falling back to the common defaults
    /// table.
    fn accel_rv_pr(&mut self, obj: u32, id: u32, layout: ObjLayout) -> SimpleResult<u32> {
        let addr = self.accel_ra_pr(obj, id, layout)?;
        if addr != 0 {
            return self.mem.read_word(addr);
        }
        let indiv = self.accel.params[P_INDIV_PROP_START];
        if id > 0 && id < indiv {
            return self
                .mem
                .read_word(self.accel.params[P_CPV_START].wrapping_add(4u32.wrapping_mul(id)));
        }
        self.accel_warning("[** Programming error: tried to read (something) **]");
        Ok(0)
    }

    /// `OP__Pr`: does the object provide the property.
    fn accel_op_pr(&mut self, obj: u32, id: u32, layout: ObjLayout) -> SimpleResult<u32> {
        let indiv = self.accel.params[P_INDIV_PROP_START];
        let zr = self.accel_z_region(obj)?;
        if zr == 3 {
            // strings provide print and print_to_array
            return Ok((id == indiv + 6 || id == indiv + 7) as u32);
        }
        if zr == 2 {
            // functions provide call
            return Ok((id == indiv + 5) as u32);
        }
        if zr != 1 {
            return Ok(0);
        }
        if (indiv..indiv + 8).contains(&id) && self.accel_obj_in_class(obj, layout)? {
            return Ok(1);
        }
        Ok((self.accel_ra_pr(obj, id, layout)? != 0) as u32)
    }
}
