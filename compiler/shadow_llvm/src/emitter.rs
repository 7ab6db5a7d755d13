//! Per-module LLVM IR emission.
//!
//! A module's text is laid out as: named type definitions for every
//! referenced class and method table, runtime extern declarations, string
//! and constant globals, class descriptors, one function definition per
//! TAC method, and the module-init thunk.
//!
//! Each TAC node that produces a value gets an SSA name recorded in the
//! emitter's side table (the node's `data` slot); operand substitution is
//! a table lookup. Temporaries number sequentially from
//! `parameters.len() + 1` — the entry block silently consumes the number
//! in between, as LLVM's implicit numbering demands. Labels get
//! monotonically increasing `L<n>` names per method.

use std::fmt::Write;

use rustc_hash::FxHashMap;
use shadow_ir::{BinaryOp, LitValue, Name, StringInterner, TypeId, UnaryOp};
use shadow_tac::{BranchKind, NodeId, NodeKind, TacMethod, TacModule};
use shadow_types::{PrimitiveKind, TypePool, TypeVariant};

use crate::abi::{
    methods_definition, object_definition, runtime_declarations, struct_name, value_type,
};
use crate::descriptors::{class_descriptor, descriptor_symbol, methods_global};
use crate::mangle::{mangle_method, mangle_type};

/// Emit the complete LLVM module text for one [`TacModule`].
pub fn emit_module(pool: &TypePool, interner: &StringInterner, module: &TacModule) -> String {
    tracing::debug!(ty = module.ty.raw(), "emitting LLVM module");
    let mut out = String::new();

    // -- type definitions for every referenced class --
    for &ty in &module.references {
        let entry = pool.entry(ty);
        if entry.is_class() || entry.is_interface() {
            let _ = writeln!(out, "{}", object_definition(pool, interner, ty));
            let _ = writeln!(out, "{}", methods_definition(pool, interner, ty));
        }
    }
    out.push('\n');
    out.push_str(&runtime_declarations(pool, interner));
    out.push_str("declare void @__checkIndex(i32 %index, i32 %size)\n\n");

    // -- string literal pool --
    let strings = collect_strings(module);
    for (name, index) in &strings {
        let text = interner.resolve(*name);
        let len = text.len() + 1;
        let _ = writeln!(
            out,
            "@.str.{index} = private unnamed_addr constant [{len} x i8] c\"{}\\00\"",
            escape(&text)
        );
        let _ = writeln!(
            out,
            "@.strobj.{index} = private constant {{ i64, i8*, i8*, i8*, i32 }} \
             {{ i64 -1, i8* null, i8* null, i8* getelementptr ([{len} x i8], [{len} x i8]* @.str.{index}, i32 0, i32 0), i32 {} }}",
            text.len()
        );
    }
    if !strings.is_empty() {
        out.push('\n');
    }

    // -- module constants --
    let module_symbol = mangle_type(pool, interner, module.ty);
    for constant in &module.constants {
        let _ = writeln!(
            out,
            "@\"{module_symbol}.{}\" = constant {} {}",
            interner.resolve(constant.name),
            value_type(pool, interner, constant.ty),
            immediate(&constant.value, &strings, pool, interner)
        );
    }

    // -- this module's method table and descriptor; referenced
    //    descriptors are external --
    let mut method_symbols = Vec::new();
    for (name, overloads) in &pool.entry(module.ty).methods {
        for &signature in overloads {
            let params = match &pool.entry(signature).variant {
                TypeVariant::Method { params, .. } => params.clone(),
                _ => Vec::new(),
            };
            method_symbols.push(mangle_method(
                pool,
                interner,
                module.ty,
                &interner.resolve(*name),
                &params,
            ));
        }
    }
    out.push_str(&methods_global(pool, interner, module.ty, &method_symbols));
    out.push_str(&class_descriptor(pool, interner, module.ty));
    for &ty in &module.references {
        if ty == module.ty {
            continue;
        }
        let entry = pool.entry(ty);
        if entry.is_class() || entry.is_interface() || entry.is_array() {
            let _ = writeln!(
                out,
                "@\"{}\" = external constant {}",
                descriptor_symbol(pool, interner, ty),
                crate::descriptors::descriptor_type(pool, ty)
            );
        }
    }
    out.push('\n');

    // -- function definitions --
    for method in &module.methods {
        let mut emitter = MethodEmitter::new(pool, interner, module, method, &strings);
        out.push_str(&emitter.emit());
        out.push('\n');
    }

    // -- module init thunk --
    let _ = writeln!(out, "define void @\"{module_symbol}._init\"() {{");
    let _ = writeln!(out, "  ret void");
    let _ = writeln!(out, "}}");
    out
}

/// Distinct string literals across all methods, in first-use order.
fn collect_strings(module: &TacModule) -> FxHashMap<Name, usize> {
    let mut strings = FxHashMap::default();
    for method in &module.methods {
        for (_, node) in method.iter() {
            if let NodeKind::Literal(LitValue::Str(name)) = node.kind {
                let next = strings.len();
                strings.entry(name).or_insert(next);
            }
        }
    }
    for constant in &module.constants {
        if let LitValue::Str(name) = constant.value {
            let next = strings.len();
            strings.entry(name).or_insert(next);
        }
    }
    strings
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'"' | b'\\' => {
                let _ = write!(out, "\\{byte:02X}");
            }
            0x20..=0x7E => out.push(byte as char),
            _ => {
                let _ = write!(out, "\\{byte:02X}");
            }
        }
    }
    out
}

/// The textual immediate for a literal.
fn immediate(
    value: &LitValue,
    strings: &FxHashMap<Name, usize>,
    pool: &TypePool,
    interner: &StringInterner,
) -> String {
    match value {
        LitValue::Boolean(b) => b.to_string(),
        LitValue::Int(v) => v.to_string(),
        LitValue::UInt(v) => v.to_string(),
        LitValue::Float(bits) => format!("0x{bits:016X}"),
        LitValue::Code(c) => c.to_string(),
        LitValue::Null => "null".to_string(),
        LitValue::Str(name) => {
            let index = strings.get(name).copied().unwrap_or(0);
            format!(
                "bitcast ({{ i64, i8*, i8*, i8*, i32 }}* @.strobj.{index} to {})",
                value_type(pool, interner, TypeId::STRING)
            )
        }
    }
}

struct MethodEmitter<'a> {
    pool: &'a TypePool,
    interner: &'a StringInterner,
    method: &'a TacMethod,
    strings: &'a FxHashMap<Name, usize>,
    /// SSA name of each value-producing node (the node's `data` slot).
    names: FxHashMap<NodeId, String>,
    labels: FxHashMap<NodeId, String>,
    label_counter: u32,
    temp_counter: u32,
    symbol: String,
    body: String,
    uses_unwind: bool,
}

impl<'a> MethodEmitter<'a> {
    fn new(
        pool: &'a TypePool,
        interner: &'a StringInterner,
        module: &'a TacModule,
        method: &'a TacMethod,
        strings: &'a FxHashMap<Name, usize>,
    ) -> Self {
        let params: Vec<TypeId> = method.locals[..method.param_count]
            .iter()
            .map(|l| l.ty)
            .collect();
        let symbol = mangle_method(
            pool,
            interner,
            module.ty,
            &interner.resolve(method.name),
            &params[1..],
        );
        MethodEmitter {
            pool,
            interner,
            method,
            strings,
            names: FxHashMap::default(),
            labels: FxHashMap::default(),
            label_counter: 0,
            // Parameters take 0..param_count-1 and the entry block takes
            // param_count, so the first temporary is param_count + 1.
            temp_counter: method.param_count as u32 + 1,
            symbol,
            body: String::new(),
            uses_unwind: false,
        }
    }

    fn temp(&mut self) -> String {
        let name = format!("%{}", self.temp_counter);
        self.temp_counter += 1;
        name
    }

    fn label(&mut self, node: NodeId) -> String {
        if let Some(existing) = self.labels.get(&node) {
            return existing.clone();
        }
        let name = format!("L{}", self.label_counter);
        self.label_counter += 1;
        self.labels.insert(node, name.clone());
        name
    }

    fn name_of(&self, node: NodeId) -> String {
        self.names
            .get(&node)
            .cloned()
            .unwrap_or_else(|| panic!("operand {node:?} has no SSA name yet"))
    }

    fn ty_of(&self, node: NodeId) -> String {
        value_type(self.pool, self.interner, self.method.node(node).ty)
    }

    fn typed(&self, node: NodeId) -> String {
        format!("{} {}", self.ty_of(node), self.name_of(node))
    }

    fn returns_type(&self) -> String {
        match &self.pool.entry(self.method.signature).variant {
            TypeVariant::Method { returns, .. } => match returns.len() {
                0 => "void".to_string(),
                1 => value_type(self.pool, self.interner, returns[0]),
                _ => {
                    let inner: Vec<String> = returns
                        .iter()
                        .map(|&r| value_type(self.pool, self.interner, r))
                        .collect();
                    format!("{{ {} }}", inner.join(", "))
                }
            },
            _ => "void".to_string(),
        }
    }

    fn emit(&mut self) -> String {
        // First pass over the sequence fills the body; unwind usage
        // decides the personality clause on the definition line.
        for (id, _) in self.method.iter() {
            self.emit_node(id);
        }

        let params: Vec<String> = self.method.locals[..self.method.param_count]
            .iter()
            .map(|l| value_type(self.pool, self.interner, l.ty))
            .collect();
        let mut out = String::new();
        let personality = if self.uses_unwind {
            " personality i32 (...)* @__shadow_personality_v0"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "define {} @\"{}\"({}){} {{",
            self.returns_type(),
            self.symbol,
            params.join(", "),
            personality
        );

        // Prologue: one stack slot per local; parameters stored in,
        // reference slots null-initialized.
        for (index, local) in self.method.locals.iter().enumerate() {
            let ty = value_type(self.pool, self.interner, local.ty);
            let _ = writeln!(out, "  %v{index} = alloca {ty}");
            if local.is_parameter {
                let _ = writeln!(out, "  store {ty} %{index}, {ty}* %v{index}");
            } else if self.pool.entry(local.ty).is_reference() {
                let _ = writeln!(out, "  store {ty} null, {ty}* %v{index}");
            }
        }

        out.push_str(&self.body);
        let _ = writeln!(out, "}}");
        out
    }

    fn line(&mut self, text: String) {
        self.body.push_str("  ");
        self.body.push_str(&text);
        self.body.push('\n');
    }

    fn emit_node(&mut self, id: NodeId) {
        let node = self.method.node(id).clone();
        match node.kind {
            NodeKind::Label => {
                // The entry label is the function's implicit entry block.
                if id != self.method.entry {
                    let label = self.label(id);
                    self.body.push_str(&label);
                    self.body.push_str(":\n");
                }
            }
            NodeKind::Phi { ref incoming } => {
                let name = self.temp();
                let is_label_phi = node.ty.is_none();
                let arms: Vec<String> = incoming
                    .iter()
                    .map(|&(value, pred)| {
                        let pred_label = self.label(pred);
                        if is_label_phi {
                            let value_label = self.label(value);
                            format!(
                                "[ blockaddress(@\"{}\", %{value_label}), %{pred_label} ]",
                                self.symbol
                            )
                        } else {
                            format!("[ {}, %{pred_label} ]", self.name_of(value))
                        }
                    })
                    .collect();
                let ty = if is_label_phi {
                    "i8*".to_string()
                } else {
                    value_type(self.pool, self.interner, node.ty)
                };
                self.line(format!("{name} = phi {ty} {}", arms.join(", ")));
                self.names.insert(id, name);
            }
            NodeKind::Literal(ref value) => {
                self.names.insert(
                    id,
                    immediate(value, self.strings, self.pool, self.interner),
                );
            }
            NodeKind::VariableRef(local) => {
                self.names.insert(id, format!("%v{}", local.index()));
            }
            NodeKind::FieldRef { object, field } => {
                let name = self.temp();
                let class_ty = self.method.node(object).ty;
                let index = self.field_index(class_ty, field);
                self.line(format!(
                    "{name} = getelementptr inbounds {owner}, {owner}* {obj}, i32 0, i32 {index}",
                    owner = struct_name(self.pool, self.interner, class_ty),
                    obj = self.name_of(object),
                ));
                self.names.insert(id, name);
            }
            NodeKind::ArrayRef {
                array,
                ref indices,
            } => self.emit_array_ref(id, array, indices),
            // The callee is materialized at the call site, where the
            // receiver value is at hand for table dispatch.
            NodeKind::MethodRef(_) => {}
            NodeKind::Load { source } => {
                let name = self.temp();
                let ty = self.ty_of(id);
                self.line(format!(
                    "{name} = load {ty}, {ty}* {}",
                    self.name_of(source)
                ));
                self.names.insert(id, name);
            }
            NodeKind::Store { target, value } => {
                let ty = self.ty_of(value);
                self.line(format!(
                    "store {ty} {}, {ty}* {}",
                    self.name_of(value),
                    self.name_of(target)
                ));
            }
            NodeKind::Call {
                method: mnode,
                ref args,
                unwind,
            } => self.emit_call(id, mnode, args, unwind, node.ty),
            NodeKind::Return { ref values } => self.emit_return(values),
            NodeKind::Cast { value } => self.emit_cast(id, value, node.ty),
            NodeKind::NewObject {
                class,
                ctor,
                ref args,
                unwind,
            } => self.emit_new_object(id, class, ctor, args, unwind),
            NodeKind::NewArray { ref dims, unwind } => {
                self.emit_new_array(id, node.ty, dims, unwind)
            }
            NodeKind::Binary { op, left, right } => self.emit_binary(id, op, left, right),
            NodeKind::Unary { op, operand } => self.emit_unary(id, op, operand),
            NodeKind::Throw { exception, unwind } => {
                self.uses_unwind = true;
                let object = struct_name(self.pool, self.interner, TypeId::OBJECT);
                let cast = self.temp();
                self.line(format!(
                    "{cast} = bitcast {} to {object}*",
                    self.typed(exception)
                ));
                match unwind {
                    Some(target) => {
                        let cont = format!("L{}", self.label_counter);
                        self.label_counter += 1;
                        let unwind_label = self.label(target);
                        self.line(format!(
                            "invoke void @__shadow_throw({object}* {cast}) to label %{cont} unwind label %{unwind_label}"
                        ));
                        self.body.push_str(&cont);
                        self.body.push_str(":\n");
                    }
                    None => {
                        self.line(format!("call void @__shadow_throw({object}* {cast})"));
                    }
                }
                self.line("unreachable".to_string());
            }
            NodeKind::CatchSwitch { ref pads, unwind } => {
                self.uses_unwind = true;
                let name = self.temp();
                let pad_labels: Vec<String> = pads
                    .iter()
                    .map(|&p| format!("label %{}", self.label(p)))
                    .collect();
                let tail = match unwind {
                    Some(target) => format!("unwind label %{}", self.label(target)),
                    None => "unwind to caller".to_string(),
                };
                self.line(format!(
                    "{name} = catchswitch within none [{}] {tail}",
                    pad_labels.join(", ")
                ));
                self.names.insert(id, name);
            }
            NodeKind::CatchPad {
                exception_ty,
                switch,
            } => {
                self.uses_unwind = true;
                let pad = self.temp();
                self.line(format!(
                    "{pad} = catchpad within {} [i8* bitcast ({{ i64, i8*, i8*, i8*, i8*, i8*, i8*, i32, i32 }}* @\"{}\" to i8*)]",
                    self.name_of(switch),
                    descriptor_symbol(self.pool, self.interner, exception_ty)
                ));
                let object = struct_name(self.pool, self.interner, TypeId::OBJECT);
                let payload = self.temp();
                self.line(format!(
                    "{payload} = call {object}* @__shadow_catch(i8* null) [ \"funclet\"(token {pad}) ]"
                ));
                let name = self.temp();
                self.line(format!(
                    "{name} = bitcast {object}* {payload} to {}",
                    value_type(self.pool, self.interner, exception_ty)
                ));
                self.names.insert(id, name);
            }
            NodeKind::CleanupPad => {
                self.uses_unwind = true;
                let name = self.temp();
                self.line(format!("{name} = cleanuppad within none []"));
                self.names.insert(id, name);
            }
            NodeKind::Resume { pad } => {
                self.line(format!(
                    "cleanupret from {} unwind to caller",
                    self.name_of(pad)
                ));
            }
            NodeKind::LandingPad => {
                self.uses_unwind = true;
                let name = self.temp();
                self.line(format!("{name} = landingpad {{ i8*, i32 }} cleanup"));
                self.names.insert(id, name);
            }
            NodeKind::IncRef { value } => self.emit_rc("__incrementRef", value),
            NodeKind::DecRef { value } => self.emit_rc("__decrementRef", value),
            NodeKind::NoOp => {}
            NodeKind::Branch(ref branch) => match branch {
                BranchKind::Unconditional { target } => {
                    let label = self.label(*target);
                    self.line(format!("br label %{label}"));
                }
                BranchKind::Conditional {
                    condition,
                    true_target,
                    false_target,
                } => {
                    let t = self.label(*true_target);
                    let f = self.label(*false_target);
                    self.line(format!(
                        "br i1 {}, label %{t}, label %{f}",
                        self.name_of(*condition)
                    ));
                }
                BranchKind::Indirect { phi } => {
                    let targets: Vec<String> = self
                        .method
                        .indirect_targets(*phi)
                        .into_iter()
                        .map(|t| format!("label %{}", self.label(t)))
                        .collect();
                    self.line(format!(
                        "indirectbr i8* {}, [{}]",
                        self.name_of(*phi),
                        targets.join(", ")
                    ));
                }
            },
        }
    }

    /// Position of `field` in the object struct: 3 header slots, then the
    /// non-constant fields in declared order.
    fn field_index(&self, class_ty: TypeId, field: Name) -> usize {
        let entry = self.pool.entry(class_ty);
        let mut index = 3;
        for f in &entry.fields {
            if f.modifiers.is_constant() {
                continue;
            }
            if f.name == field {
                return index;
            }
            index += 1;
        }
        // Inherited field: the emitter only sees flattened layouts, so a
        // miss is a front-end bug.
        panic!("field not found on {class_ty:?}");
    }

    fn emit_array_ref(&mut self, id: NodeId, array: NodeId, indices: &[NodeId]) {
        let array_ty = self.method.node(array).ty;
        let (base, dims) = match &self.pool.entry(array_ty).variant {
            TypeVariant::Array { base, dims, .. } => (*base, *dims as usize),
            _ => panic!("array reference through a non-array value"),
        };
        let element = value_type(self.pool, self.interner, base);
        let arr_value = value_type(self.pool, self.interner, array_ty);
        let data = self.temp();
        self.line(format!(
            "{data} = extractvalue {arr_value} {}, 0",
            self.name_of(array)
        ));

        // Row-major linearization: index = ((i0 * d1) + i1) * d2 + ...
        let mut linear = self.name_of(indices[0]);
        for dimension in 1..dims {
            let extent = self.temp();
            self.line(format!(
                "{extent} = extractvalue {arr_value} {}, {}",
                self.name_of(array),
                dimension + 1
            ));
            let scaled = self.temp();
            self.line(format!("{scaled} = mul i32 {linear}, {extent}"));
            let sum = self.temp();
            self.line(format!(
                "{sum} = add i32 {scaled}, {}",
                self.name_of(indices[dimension])
            ));
            linear = sum;
        }

        let extent = self.temp();
        self.line(format!(
            "{extent} = extractvalue {arr_value} {}, 1",
            self.name_of(array)
        ));
        self.line(format!("call void @__checkIndex(i32 {linear}, i32 {extent})"));

        let name = self.temp();
        self.line(format!(
            "{name} = getelementptr {element}, {element}* {data}, i32 {linear}"
        ));
        self.names.insert(id, name);
    }

    fn signature_params(&self, signature: TypeId) -> Vec<TypeId> {
        match &self.pool.entry(signature).variant {
            TypeVariant::Method { params, .. } => params.clone(),
            _ => Vec::new(),
        }
    }

    fn signature_returns(&self, signature: TypeId) -> String {
        match &self.pool.entry(signature).variant {
            TypeVariant::Method { returns, .. } => match returns.len() {
                0 => "void".to_string(),
                1 => value_type(self.pool, self.interner, returns[0]),
                _ => {
                    let inner: Vec<String> = returns
                        .iter()
                        .map(|&r| value_type(self.pool, self.interner, r))
                        .collect();
                    format!("{{ {} }}", inner.join(", "))
                }
            },
            _ => "void".to_string(),
        }
    }

    fn emit_call(
        &mut self,
        id: NodeId,
        mnode: NodeId,
        args: &[NodeId],
        unwind: Option<NodeId>,
        result_ty: TypeId,
    ) {
        let NodeKind::MethodRef(mref) = &self.method.node(mnode).kind else {
            panic!("call through a non-method operand");
        };
        let mref = *mref;
        let callee = self.resolve_callee(mnode, mref, args);
        let ret = self.signature_returns(mref.signature);
        let arg_list: Vec<String> = args.iter().map(|&a| self.typed(a)).collect();
        let produces = ret != "void";
        let name = if produces { self.temp() } else { String::new() };
        let prefix = if produces {
            format!("{name} = ")
        } else {
            String::new()
        };

        match unwind {
            Some(target) => {
                self.uses_unwind = true;
                let cont = format!("L{}", self.label_counter);
                self.label_counter += 1;
                let unwind_label = self.label(target);
                self.line(format!(
                    "{prefix}invoke {ret} {callee}({}) to label %{cont} unwind label %{unwind_label}",
                    arg_list.join(", ")
                ));
                self.body.push_str(&cont);
                self.body.push_str(":\n");
            }
            None => {
                self.line(format!("{prefix}call {ret} {callee}({})", arg_list.join(", ")));
            }
        }
        if produces && !result_ty.is_none() {
            self.names.insert(id, name);
        }
    }

    /// Materialize the callee: direct symbol for classes, a method-table
    /// load for interface receivers.
    fn resolve_callee(
        &mut self,
        _mnode: NodeId,
        mref: shadow_types::MethodRef,
        args: &[NodeId],
    ) -> String {
        let owner_entry = self.pool.entry(mref.owner);
        let method_name = self
            .interner
            .resolve(self.pool.entry(mref.signature).name);
        let params = self.signature_params(mref.signature);

        if !owner_entry.is_interface() {
            return format!(
                "@\"{}\"",
                mangle_method(self.pool, self.interner, mref.owner, &method_name, &params)
            );
        }

        // Interface dispatch through the receiver's method table.
        let receiver = args[0];
        let owner = struct_name(self.pool, self.interner, mref.owner);
        let table_ptr = self.temp();
        self.line(format!(
            "{table_ptr} = getelementptr inbounds {owner}, {owner}* {}, i32 0, i32 2",
            self.name_of(receiver)
        ));
        let table = self.temp();
        self.line(format!(
            "{table} = load i8**, i8*** {table_ptr}"
        ));
        let mut slot = 0usize;
        for (name, overloads) in &owner_entry.methods {
            if *name == self.pool.entry(mref.signature).name {
                slot += mref.overload as usize;
                break;
            }
            slot += overloads.len();
        }
        let slot_ptr = self.temp();
        self.line(format!(
            "{slot_ptr} = getelementptr i8*, i8** {table}, i32 {slot}"
        ));
        let raw = self.temp();
        self.line(format!("{raw} = load i8*, i8** {slot_ptr}"));
        let ret = self.signature_returns(mref.signature);
        let param_types: Vec<String> = args.iter().map(|&a| self.ty_of(a)).collect();
        let fn_ty = format!("{ret} ({})", param_types.join(", "));
        let fnptr = self.temp();
        self.line(format!("{fnptr} = bitcast i8* {raw} to {fn_ty}*"));
        fnptr
    }

    fn emit_return(&mut self, values: &[NodeId]) {
        match values.len() {
            0 => self.line("ret void".to_string()),
            1 => {
                let value = self.typed(values[0]);
                self.line(format!("ret {value}"));
            }
            _ => {
                // Aggregate the values into the return struct.
                let struct_ty = self.returns_type();
                let mut current = "undef".to_string();
                for (index, &value) in values.iter().enumerate() {
                    let next = self.temp();
                    self.line(format!(
                        "{next} = insertvalue {struct_ty} {current}, {}, {index}",
                        self.typed(value)
                    ));
                    current = next;
                }
                self.line(format!("ret {struct_ty} {current}"));
            }
        }
    }

    fn emit_cast(&mut self, id: NodeId, value: NodeId, to: TypeId) {
        let from = self.method.node(value).ty;
        let from_ty = self.ty_of(value);
        let to_ty = value_type(self.pool, self.interner, to);
        if from == to {
            let name = self.name_of(value);
            self.names.insert(id, name);
            return;
        }
        let op = cast_op(self.pool, from, to);
        let name = self.temp();
        self.line(format!(
            "{name} = {op} {from_ty} {} to {to_ty}",
            self.name_of(value)
        ));
        self.names.insert(id, name);
    }

    fn emit_new_object(
        &mut self,
        id: NodeId,
        class: TypeId,
        ctor: shadow_types::MethodRef,
        args: &[NodeId],
        unwind: Option<NodeId>,
    ) {
        let object = struct_name(self.pool, self.interner, TypeId::OBJECT);
        let class_struct = struct_name(self.pool, self.interner, TypeId::CLASS);
        let raw = self.temp();
        self.line(format!(
            "{raw} = call {object}* @__allocate({class_struct}* bitcast ({{ i64, i8*, i8*, i8*, i8*, i8*, i8*, i32, i32 }}* @\"{}\" to {class_struct}*))",
            descriptor_symbol(self.pool, self.interner, class)
        ));
        let typed = self.temp();
        let class_ty = value_type(self.pool, self.interner, class);
        self.line(format!("{typed} = bitcast {object}* {raw} to {class_ty}"));

        // Run the constructor over the fresh object.
        if !ctor.signature.is_none() {
            let params = self.signature_params(ctor.signature);
            let symbol = mangle_method(self.pool, self.interner, class, "create", &params);
            let mut arg_list = vec![format!("{class_ty} {typed}")];
            arg_list.extend(args.iter().map(|&a| self.typed(a)));
            match unwind {
                Some(target) => {
                    self.uses_unwind = true;
                    let cont = format!("L{}", self.label_counter);
                    self.label_counter += 1;
                    let unwind_label = self.label(target);
                    self.line(format!(
                        "invoke void @\"{symbol}\"({}) to label %{cont} unwind label %{unwind_label}",
                        arg_list.join(", ")
                    ));
                    self.body.push_str(&cont);
                    self.body.push_str(":\n");
                }
                None => {
                    self.line(format!("call void @\"{symbol}\"({})", arg_list.join(", ")));
                }
            }
        }
        self.names.insert(id, typed);
    }

    fn emit_new_array(
        &mut self,
        id: NodeId,
        array_ty: TypeId,
        dims: &[NodeId],
        _unwind: Option<NodeId>,
    ) {
        let (base, _) = match &self.pool.entry(array_ty).variant {
            TypeVariant::Array { base, dims, .. } => (*base, *dims),
            _ => panic!("array allocation with a non-array type"),
        };
        let object = struct_name(self.pool, self.interner, TypeId::OBJECT);
        let class_struct = struct_name(self.pool, self.interner, TypeId::CLASS);

        // Total element count is the product of the extents.
        let mut total = self.temp();
        self.line(format!(
            "{total} = sext i32 {} to i64",
            self.name_of(dims[0])
        ));
        for &dim in &dims[1..] {
            let widened = self.temp();
            self.line(format!("{widened} = sext i32 {} to i64", self.name_of(dim)));
            let product = self.temp();
            self.line(format!("{product} = mul i64 {total}, {widened}"));
            total = product;
        }

        let raw = self.temp();
        self.line(format!(
            "{raw} = call {object}* @__allocateArray({class_struct}* bitcast ({{ i64, i8*, i8*, i8*, i8*, i8*, i8*, i32, i32 }}* @\"{}\" to {class_struct}*), i64 {total})",
            descriptor_symbol(self.pool, self.interner, array_ty)
        ));
        let element = value_type(self.pool, self.interner, base);
        let data = self.temp();
        self.line(format!("{data} = bitcast {object}* {raw} to {element}*"));

        // Assemble the by-value descriptor.
        let arr_value = value_type(self.pool, self.interner, array_ty);
        let mut current = self.temp();
        self.line(format!(
            "{current} = insertvalue {arr_value} undef, {element}* {data}, 0"
        ));
        for (index, &dim) in dims.iter().enumerate() {
            let next = self.temp();
            self.line(format!(
                "{next} = insertvalue {arr_value} {current}, i32 {}, {}",
                self.name_of(dim),
                index + 1
            ));
            current = next;
        }
        self.names.insert(id, current);
    }

    fn emit_binary(&mut self, id: NodeId, op: BinaryOp, left: NodeId, right: NodeId) {
        let operand_ty = self.method.node(left).ty;
        let kind = primitive_kind(self.pool, operand_ty);
        let ty = self.ty_of(left);
        let name = self.temp();
        let text = if op.is_comparison() {
            let predicate = comparison_predicate(op, kind);
            let instruction = if matches!(kind, Some(k) if k.is_floating()) {
                "fcmp"
            } else {
                "icmp"
            };
            format!(
                "{name} = {instruction} {predicate} {ty} {}, {}",
                self.name_of(left),
                self.name_of(right)
            )
        } else {
            let instruction = arithmetic_instruction(op, kind);
            format!(
                "{name} = {instruction} {ty} {}, {}",
                self.name_of(left),
                self.name_of(right)
            )
        };
        self.line(text);
        self.names.insert(id, name);
    }

    fn emit_unary(&mut self, id: NodeId, op: UnaryOp, operand: NodeId) {
        let ty = self.ty_of(operand);
        let kind = primitive_kind(self.pool, self.method.node(operand).ty);
        let name = self.temp();
        let text = match op {
            UnaryOp::Neg if matches!(kind, Some(k) if k.is_floating()) => {
                format!("{name} = fneg {ty} {}", self.name_of(operand))
            }
            UnaryOp::Neg => format!("{name} = sub {ty} 0, {}", self.name_of(operand)),
            UnaryOp::Not => format!("{name} = xor {ty} {}, true", self.name_of(operand)),
            UnaryOp::Complement => format!("{name} = xor {ty} {}, -1", self.name_of(operand)),
        };
        self.line(text);
        self.names.insert(id, name);
    }

    fn emit_rc(&mut self, helper: &str, value: NodeId) {
        let object = struct_name(self.pool, self.interner, TypeId::OBJECT);
        let cast = self.temp();
        self.line(format!("{cast} = bitcast {} to {object}*", self.typed(value)));
        self.line(format!("call void @{helper}({object}* {cast})"));
    }
}

fn primitive_kind(pool: &TypePool, ty: TypeId) -> Option<PrimitiveKind> {
    match &pool.entry(ty).variant {
        TypeVariant::Primitive(kind) => Some(*kind),
        _ => None,
    }
}

fn comparison_predicate(op: BinaryOp, kind: Option<PrimitiveKind>) -> &'static str {
    let floating = matches!(kind, Some(k) if k.is_floating());
    let signed = matches!(kind, Some(k) if k.is_signed());
    match (op, floating, signed) {
        (BinaryOp::Eq, true, _) => "oeq",
        (BinaryOp::Ne, true, _) => "one",
        (BinaryOp::Lt, true, _) => "olt",
        (BinaryOp::Le, true, _) => "ole",
        (BinaryOp::Gt, true, _) => "ogt",
        (BinaryOp::Ge, true, _) => "oge",
        (BinaryOp::Eq, false, _) => "eq",
        (BinaryOp::Ne, false, _) => "ne",
        (BinaryOp::Lt, false, true) => "slt",
        (BinaryOp::Le, false, true) => "sle",
        (BinaryOp::Gt, false, true) => "sgt",
        (BinaryOp::Ge, false, true) => "sge",
        (BinaryOp::Lt, false, false) => "ult",
        (BinaryOp::Le, false, false) => "ule",
        (BinaryOp::Gt, false, false) => "ugt",
        (BinaryOp::Ge, false, false) => "uge",
        _ => "eq",
    }
}

fn arithmetic_instruction(op: BinaryOp, kind: Option<PrimitiveKind>) -> &'static str {
    let floating = matches!(kind, Some(k) if k.is_floating());
    let signed = matches!(kind, Some(k) if k.is_signed());
    match op {
        BinaryOp::Add if floating => "fadd",
        BinaryOp::Sub if floating => "fsub",
        BinaryOp::Mul if floating => "fmul",
        BinaryOp::Div if floating => "fdiv",
        BinaryOp::Rem if floating => "frem",
        BinaryOp::Add => "add",
        BinaryOp::Sub => "sub",
        BinaryOp::Mul => "mul",
        BinaryOp::Div if signed => "sdiv",
        BinaryOp::Div => "udiv",
        BinaryOp::Rem if signed => "srem",
        BinaryOp::Rem => "urem",
        BinaryOp::BitAnd | BinaryOp::CondAnd => "and",
        BinaryOp::BitOr | BinaryOp::CondOr => "or",
        BinaryOp::BitXor => "xor",
        BinaryOp::Shl => "shl",
        BinaryOp::Shr if signed => "ashr",
        BinaryOp::Shr => "lshr",
        _ => "add",
    }
}

/// Pick the conversion instruction between two Shadow types.
fn cast_op(pool: &TypePool, from: TypeId, to: TypeId) -> &'static str {
    let from_kind = primitive_kind(pool, from);
    let to_kind = primitive_kind(pool, to);
    match (from_kind, to_kind) {
        (Some(f), Some(t)) => {
            if f.is_floating() && t.is_floating() {
                if t.width() > f.width() {
                    "fpext"
                } else {
                    "fptrunc"
                }
            } else if f.is_floating() {
                if t.is_signed() {
                    "fptosi"
                } else {
                    "fptoui"
                }
            } else if t.is_floating() {
                if f.is_signed() {
                    "sitofp"
                } else {
                    "uitofp"
                }
            } else if t.width() > f.width() {
                if f.is_signed() {
                    "sext"
                } else {
                    "zext"
                }
            } else if t.width() < f.width() {
                "trunc"
            } else {
                "bitcast"
            }
        }
        // Reference up/down casts keep the representation.
        _ => "bitcast",
    }
}
