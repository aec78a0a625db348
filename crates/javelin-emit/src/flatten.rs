//! Object-graph flattening into C global declarations.
//!
//! The flattener walks a live object graph depth first and emits one
//! `static` global per reachable heap object, labeling each object with
//! its C symbol *before* recursing into its fields so that shared and
//! cyclic structure collapses to symbol reuse. Forward references are
//! resolved per the [`HeapModel`] policy: prototypes plus mutual
//! references for plain C, or zero placeholders plus deferred assignment
//! statements for portable targets.
//!
//! Output layout per object kind:
//!
//! - record: `static struct X_4 gvarN = { 4 << 8, v0, v1, ... };`
//! - primitive array: component-typed array whose first slots hold the
//!   packed array header in the target byte order.
//! - reference array: pointer array with a packed 64-bit header cast to
//!   the component type; element slot `i` lives at index `i + 1`.
//! - string: `static char gvarN[] = "<octal header>" "<body>";`
//! - immutable value: no global at all; the symbol is an inline compound
//!   literal.
//! - opaque native: header and zeroed flag, no body data.

use log::trace;

use javelin_core::error::FlattenError;
use javelin_core::header::{self, HeaderFlags};
use javelin_core::identity::IdentityTracker;
use javelin_core::provider::TypeProvider;
use javelin_core::types::{FieldDef, JavaType, PrimKind, QualifiedName};
use javelin_core::value::{ObjRef, ObjectBody, PrimArray, Value};
use javelin_registry::{DescriptorId, TypeKind, TypeRegistry};

use crate::heap::HeapModel;

/// Everything a flattening session produced.
#[derive(Debug)]
pub struct FlattenOutput {
    /// Global variable declarations, in emission order.
    pub declarations: String,
    /// Startup statements patching forward references (empty unless the
    /// heap model is portable).
    pub initializers: String,
}

/// Depth-first flattener for one compilation unit.
///
/// Drives the shared [`TypeRegistry`], so every class, array kind, and
/// string reached here is registered and marked as instantiated for the
/// definition emitter.
pub struct ObjectFlattener<'a> {
    registry: &'a mut TypeRegistry,
    provider: &'a dyn TypeProvider,
    heap: HeapModel,
    little_endian: bool,
    symbols: IdentityTracker<String>,
    next_global: usize,
    out: String,
}

impl<'a> ObjectFlattener<'a> {
    pub fn new(
        registry: &'a mut TypeRegistry,
        provider: &'a dyn TypeProvider,
        heap: HeapModel,
        little_endian: bool,
    ) -> Self {
        ObjectFlattener {
            registry,
            provider,
            heap,
            little_endian,
            symbols: IdentityTracker::new(),
            next_global: 0,
            out: String::new(),
        }
    }

    /// Flattens the graph reachable from `root`. May be called more than
    /// once per session; objects already emitted are not emitted again.
    pub fn flatten(&mut self, root: &Value) -> Result<(), FlattenError> {
        match root {
            Value::Ref(obj) => self.emit_object(obj),
            _ => Ok(()),
        }
    }

    /// The C expression naming `value`: a scalar literal, `0` for null,
    /// or the symbol assigned during flattening.
    pub fn symbol(&self, value: &Value) -> Option<String> {
        match value {
            Value::Null => Some("0".to_string()),
            Value::Ref(obj) => self.symbols.get(obj).cloned(),
            scalar => scalar_code(scalar),
        }
    }

    pub fn declarations(&self) -> &str {
        &self.out
    }

    pub fn finish(self) -> FlattenOutput {
        FlattenOutput {
            declarations: self.out,
            initializers: self.heap.initializer_code(),
        }
    }

    fn fresh_gvar(&mut self) -> String {
        let name = format!("gvar{}", self.next_global);
        self.next_global += 1;
        name
    }

    fn emit_object(&mut self, obj: &ObjRef) -> Result<(), FlattenError> {
        if self.symbols.get(obj).is_some() {
            return Ok(());
        }
        let gvar = self.fresh_gvar();
        trace!("flattening {} into {gvar}", obj.runtime_type());
        let body = obj.body();
        match &*body {
            ObjectBody::PrimArray(arr) => {
                self.symbols.insert(obj, gvar.clone());
                self.prim_array_code(arr, &gvar);
                Ok(())
            }
            ObjectBody::RefArray { component, elems } => {
                let ty = JavaType::RefArray(Box::new(component.clone()));
                let did = self.registry.register(&ty, self.provider)?;
                self.symbols.insert(obj, gvar.clone());
                self.ref_array_code(did, component, elems, &gvar)
            }
            ObjectBody::Str(s) => {
                let did = self.registry.register(&JavaType::string(), self.provider)?;
                self.registry.mark_instantiated(did);
                self.symbols
                    .set(obj, format!("((struct java_string*){gvar})"));
                self.string_code(s, &gvar);
                Ok(())
            }
            ObjectBody::Record { class, fields } => {
                let did = self
                    .registry
                    .register(&JavaType::Class(class.clone()), self.provider)?;
                self.registry.mark_instantiated(did);
                match self.registry.get(did).kind() {
                    TypeKind::ImmutableValue { .. } => {
                        self.immutable_code(obj, did, class, fields, &gvar)
                    }
                    TypeKind::Opaque { .. } => {
                        self.symbols.set(obj, format!("&{gvar}"));
                        self.opaque_code(did, &gvar);
                        Ok(())
                    }
                    _ => self.record_code(obj, did, class, fields, &gvar),
                }
            }
        }
    }

    fn record_code(
        &mut self,
        obj: &ObjRef,
        did: DescriptorId,
        class: &QualifiedName,
        values: &[Value],
        gvar: &str,
    ) -> Result<(), FlattenError> {
        self.symbols.set(obj, format!("&{gvar}"));
        let desc = self.registry.get(did);
        let object_type = desc.object_type();
        let type_id = desc.type_id();
        let decl_fields = desc.fields().to_vec();
        check_field_count(class, &decl_fields, values)?;

        if !self.heap.portable_initialization() {
            let proto = self.heap.prototype_code(&object_type, gvar);
            self.out.push_str(&proto);
        }
        for v in values {
            if let Value::Ref(o) = v {
                self.emit_object(o)?;
            }
        }

        let mut line = self.heap.declaration_code(&object_type, gvar);
        line.push_str(&format!(" = {{ {} << {}", type_id, header::FLAG_BITS));
        for (i, v) in values.iter().enumerate() {
            line.push_str(", ");
            match v {
                Value::Null => line.push('0'),
                Value::Ref(o) => {
                    if self.heap.portable_initialization() {
                        line.push('0');
                        let init = self.deferred_field_init(did, i, &decl_fields[i], o, gvar)?;
                        self.heap.add_initializer(init);
                    } else {
                        let expr =
                            self.field_ref_code(&decl_fields[i], o, class)?;
                        line.push_str(&expr);
                    }
                }
                scalar => line.push_str(&scalar_code_or_fail(scalar, class, &decl_fields[i])?),
            }
        }
        line.push_str(" };\n");
        self.out.push_str(&line);
        Ok(())
    }

    /// Reference field expression: optional cast plus the value's symbol.
    fn field_ref_code(
        &mut self,
        field: &FieldDef,
        value: &ObjRef,
        class: &QualifiedName,
    ) -> Result<String, FlattenError> {
        let mut s = String::new();
        if field.ty.is_array() {
            if let Some(cast) = cast_for_array(&field.ty) {
                s.push_str(cast);
            }
        } else if field.ty != value.runtime_type() {
            let fid = self.registry.register(&field.ty, self.provider)?;
            s.push('(');
            s.push_str(&self.registry.get(fid).reference_type());
            s.push(')');
        }
        let sym = self.symbols.get(value).cloned().ok_or_else(|| {
            FlattenError::FieldAccess { class: class.clone(), field: field.name.clone() }
        })?;
        s.push_str(&sym);
        Ok(s)
    }

    /// Deferred assignment patching one reference field after all
    /// globals are declared.
    fn deferred_field_init(
        &mut self,
        record: DescriptorId,
        index: usize,
        field: &FieldDef,
        value: &ObjRef,
        gvar: &str,
    ) -> Result<String, FlattenError> {
        let member = self.registry.get(record).field_member(index);
        let class = self.registry.get(record).ty().class_name().cloned();
        let mut s = format!("{gvar}.{member}");
        if field.ty.is_array() {
            s.push_str(" = ");
            if let Some(cast) = cast_for_array(&field.ty) {
                s.push_str(cast);
            }
        } else {
            let fid = self.registry.register(&field.ty, self.provider)?;
            match *self.registry.get(fid).kind() {
                TypeKind::ImmutableValue { is_union } => {
                    // An interface-typed slot is a union; pick the member
                    // for the value's concrete type.
                    if is_union {
                        let vid =
                            self.registry.register(&value.runtime_type(), self.provider)?;
                        s.push('.');
                        s.push_str(&self.registry.get(vid).union_member());
                    }
                    s.push_str(" = ");
                }
                _ => {
                    s.push_str(" = ");
                    if field.ty != value.runtime_type() {
                        s.push('(');
                        s.push_str(&self.registry.get(fid).reference_type());
                        s.push(')');
                    }
                }
            }
        }
        let sym = self.symbols.get(value).cloned().ok_or_else(|| {
            FlattenError::FieldAccess {
                class: class.unwrap_or_else(|| QualifiedName::new(QualifiedName::OBJECT)),
                field: field.name.clone(),
            }
        })?;
        s.push_str(&sym);
        s.push_str(";\n");
        Ok(s)
    }

    /// Immutable values become inline compound literals; the symbol *is*
    /// the literal and no global is declared.
    fn immutable_code(
        &mut self,
        obj: &ObjRef,
        did: DescriptorId,
        class: &QualifiedName,
        values: &[Value],
        gvar: &str,
    ) -> Result<(), FlattenError> {
        // provisional label so a field referring back does not recurse
        self.symbols.set(obj, gvar.to_string());
        let desc = self.registry.get(did);
        let object_type = desc.object_type();
        let header_word = desc.header_word(HeaderFlags::empty());
        let decl_fields = desc.fields().to_vec();
        check_field_count(class, &decl_fields, values)?;

        for v in values {
            if let Value::Ref(o) = v {
                self.emit_object(o)?;
            }
        }

        let mut sb = format!("({object_type}){{ {header_word}");
        for (i, v) in values.iter().enumerate() {
            sb.push_str(", ");
            match v {
                Value::Null => sb.push('0'),
                Value::Ref(o) => {
                    let expr = self.field_ref_code(&decl_fields[i], o, class)?;
                    sb.push_str(&expr);
                }
                scalar => sb.push_str(&scalar_code_or_fail(scalar, class, &decl_fields[i])?),
            }
        }
        sb.push_str(" }");
        self.symbols.set(obj, sb);
        Ok(())
    }

    /// Opaque natives transfer no body data; the flag word resets to 0.
    fn opaque_code(&mut self, did: DescriptorId, gvar: &str) {
        let desc = self.registry.get(did);
        let line = format!(
            "{} = {{ {} << {}, 0 }};\n",
            self.heap.declaration_code(&desc.object_type(), gvar),
            desc.type_id(),
            header::FLAG_BITS
        );
        self.out.push_str(&line);
    }

    fn ref_array_code(
        &mut self,
        did: DescriptorId,
        component: &JavaType,
        elems: &[Value],
        gvar: &str,
    ) -> Result<(), FlattenError> {
        for v in elems {
            if let Value::Ref(o) = v {
                self.emit_object(o)?;
            }
        }
        let desc = self.registry.get(did);
        let comp_type = desc.object_type();
        let head = long_array_head(desc.type_id(), elems.len(), self.little_endian);
        let mut line = self.heap.declaration_code(&comp_type, gvar);
        line.push_str(&format!("[] = {{ ({comp_type}){head}"));
        for (i, v) in elems.iter().enumerate() {
            line.push_str(", ");
            match v {
                Value::Null => line.push('0'),
                Value::Ref(o) => {
                    let cast = if o.runtime_type() != *component {
                        format!("({comp_type})")
                    } else {
                        String::new()
                    };
                    let sym = self.symbols.get(o).cloned().ok_or_else(|| {
                        FlattenError::Unsupported(JavaType::ref_array(component.clone()))
                    })?;
                    if self.heap.portable_initialization() {
                        line.push('0');
                        // header occupies slot 0, elements start at 1
                        self.heap
                            .add_initializer(format!("{gvar}[{}] = {cast}{sym};\n", i + 1));
                    } else {
                        line.push_str(&cast);
                        line.push_str(&sym);
                    }
                }
                _ => {
                    return Err(FlattenError::Unsupported(JavaType::ref_array(
                        component.clone(),
                    )));
                }
            }
        }
        line.push_str(" };\n");
        self.out.push_str(&line);
        Ok(())
    }

    fn prim_array_code(&mut self, arr: &PrimArray, gvar: &str) {
        let kind = arr.kind();
        // float and double elements are stored as their bit patterns, so
        // the declared component type is the same-width integer type.
        let comp = match kind {
            PrimKind::Float => "int",
            PrimKind::Double => "long",
            k => k.c_name(),
        };
        let mut line = self.heap.declaration_code(comp, gvar);
        line.push_str("[] = { ");
        line.push_str(&prim_array_head(kind, arr.len(), self.little_endian));
        for i in 0..arr.len() {
            line.push_str(", ");
            line.push_str(&prim_elem_code(arr, i));
        }
        line.push_str(" };\n");
        self.out.push_str(&line);
    }

    fn string_code(&mut self, s: &str, gvar: &str) {
        let mut line = self.heap.declaration_code("char", gvar);
        line.push_str("[] = ");
        line.push_str(&encode_string(s, self.little_endian));
        line.push_str(";\n");
        self.out.push_str(&line);
    }
}

fn check_field_count(
    class: &QualifiedName,
    declared: &[FieldDef],
    values: &[Value],
) -> Result<(), FlattenError> {
    if declared.len() != values.len() {
        return Err(FlattenError::FieldMismatch {
            class: class.clone(),
            declared: declared.len(),
            actual: values.len(),
        });
    }
    Ok(())
}

/// C literal for a scalar value. Booleans become `1`/`0`, chars their
/// code point, longs get an `L` suffix, floats an `f` suffix. Float and
/// double keep their decimal text here; only array elements use bit
/// patterns.
fn scalar_code(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Byte(v) => Some(v.to_string()),
        Value::Char(v) => Some(v.to_string()),
        Value::Short(v) => Some(v.to_string()),
        Value::Int(v) => Some(v.to_string()),
        Value::Long(v) => Some(format!("{v}L")),
        Value::Float(v) => Some(format!("{v:?}f")),
        Value::Double(v) => Some(format!("{v:?}")),
        Value::Null | Value::Ref(_) => None,
    }
}

fn scalar_code_or_fail(
    value: &Value,
    class: &QualifiedName,
    field: &FieldDef,
) -> Result<String, FlattenError> {
    scalar_code(value).ok_or_else(|| FlattenError::FieldAccess {
        class: class.clone(),
        field: field.name.clone(),
    })
}

/// Cast needed when a bit-pattern array is assigned to a float or double
/// pointer slot.
fn cast_for_array(ty: &JavaType) -> Option<&'static str> {
    match ty {
        JavaType::PrimArray(PrimKind::Float) => Some("(float*)"),
        JavaType::PrimArray(PrimKind::Double) => Some("(double*)"),
        _ => None,
    }
}

/// Array header slots for a primitive array, packed for the target byte
/// order. Components narrower than 32 bits pack the header word and the
/// length into component-sized slots; int-sized components use two plain
/// words; 64-bit components share the packed 64-bit header with
/// reference arrays.
fn prim_array_head(kind: PrimKind, len: usize, little_endian: bool) -> String {
    let tid = kind.array_type_id();
    match kind {
        PrimKind::Bool | PrimKind::Byte => {
            let mut parts = Vec::with_capacity(8);
            if little_endian {
                parts.extend(["0".to_string(), "0".to_string(), "0".to_string(), tid.to_string()]);
                for i in (0..32).step_by(8) {
                    parts.push(((len >> i) & 0xff).to_string());
                }
            } else {
                parts.extend([tid.to_string(), "0".to_string(), "0".to_string(), "0".to_string()]);
                for i in [24, 16, 8, 0] {
                    parts.push(((len >> i) & 0xff).to_string());
                }
            }
            parts.join(", ")
        }
        PrimKind::Char | PrimKind::Short => {
            let word = u32::from(tid) << 8;
            if little_endian {
                format!("0, {word}, {}, {}", len & 0xffff, len >> 16)
            } else {
                format!("{word}, 0, {}, {}", len >> 16, len & 0xffff)
            }
        }
        PrimKind::Long | PrimKind::Double => {
            long_array_head(u32::from(tid), len, little_endian)
        }
        _ => format!("0x{:x}, {len}", u32::from(tid) << 24),
    }
}

/// Packed 64-bit array header: type id byte and 32-bit length positioned
/// for the target byte order.
fn long_array_head(kind_id: u32, len: usize, little_endian: bool) -> String {
    let value: u64 = if little_endian {
        ((len as u64) << 32) | (u64::from(kind_id) << 24)
    } else {
        (u64::from(kind_id) << 56) | len as u64
    };
    format!("0x{value:x}L")
}

/// String literal whose first eight bytes are the string header (type id
/// and length) as octal escapes, followed by the escaped body. The
/// compiler appends the terminating NUL.
fn encode_string(s: &str, little_endian: bool) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::from('"');
    encode_int(&mut out, header::STRING_TYPE_ID, little_endian);
    encode_int(&mut out, chars.len() as u32, little_endian);
    out.push_str("\" \"");
    for c in chars {
        match c {
            '\n' => out.push_str("\\n"),
            '"' | '\'' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn encode_int(out: &mut String, v: u32, little_endian: bool) {
    let shifts: [u32; 4] = if little_endian { [0, 8, 16, 24] } else { [24, 16, 8, 0] };
    for shift in shifts {
        out.push('\\');
        out.push_str(&format!("{:o}", (v >> shift) & 0xff));
    }
}

fn prim_elem_code(arr: &PrimArray, i: usize) -> String {
    match arr {
        PrimArray::Bool(v) => if v[i] { "1" } else { "0" }.to_string(),
        PrimArray::Byte(v) => v[i].to_string(),
        PrimArray::Char(v) => v[i].to_string(),
        PrimArray::Short(v) => v[i].to_string(),
        PrimArray::Int(v) => v[i].to_string(),
        PrimArray::Long(v) => format!("{}L", v[i]),
        // IEEE-754 bit patterns survive the text round trip exactly
        PrimArray::Float(v) => (v[i].to_bits() as i32).to_string(),
        PrimArray::Double(v) => format!("0x{:x}L", v[i].to_bits()),
    }
}
