//! DWARF type walker and out-of-line definition merge.

use std::collections::{HashMap, HashSet};

use gimli::{
    constants, AttributeValue, DebugTypeSignature, DebuggingInformationEntry, EntriesTreeIter, Operation, Reader, Unit,
    UnitOffset, UnitSectionOffset, UnitType,
};
use tracing::{debug, debug_span, trace, warn};

use super::{OwnedDwarf, OwnedReader};
use crate::demangle::{normalize_member_name, normalize_type_name};
use crate::error::{map_dwarf_error, TypedigResult};
use crate::merge::{merge_by_linkage, LinkedDefinition};
use crate::resolve::{resolve_optional, DependentTypes, TypeGraph, TypeNode};
use crate::types::{synthetic_arg_name, Accessibility, Argument, Field, Method, Type};

type Entry<'abbrev, 'unit> = DebuggingInformationEntry<'abbrev, 'unit, OwnedReader>;

/// A DIE, addressed by unit index and offset within that unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DieRef
{
    pub unit: usize,
    pub offset: UnitOffset<usize>,
}

/// Formal parameters of a subprogram.
#[derive(Debug, Default)]
struct Parameters
{
    args: Vec<Argument>,
    /// An artificial (object pointer) parameter was present.
    has_object: bool,
    variadic: bool,
}

/// Parsed units of one DWARF source, valid for a single query.
pub struct DwarfWalker<'a>
{
    dwarf: &'a OwnedDwarf,
    units: Vec<Unit<OwnedReader>>,
}

impl<'a> DwarfWalker<'a>
{
    pub fn new(dwarf: &'a OwnedDwarf) -> TypedigResult<Self>
    {
        let mut units = Vec::new();
        let mut headers = dwarf.units();
        while let Some(header) = headers
            .next()
            .map_err(|err| map_dwarf_error("reading .debug_info unit header", err))?
        {
            units.push(
                dwarf
                    .unit(header)
                    .map_err(|err| map_dwarf_error("parsing compilation unit", err))?,
            );
        }

        let mut type_headers = dwarf.type_units();
        while let Some(header) = type_headers
            .next()
            .map_err(|err| map_dwarf_error("reading .debug_types unit header", err))?
        {
            units.push(dwarf.unit(header).map_err(|err| map_dwarf_error("parsing type unit", err))?);
        }

        Ok(Self { dwarf, units })
    }

    /// Reconstruct the first class or struct named `name`.
    ///
    /// Errors while reading members stop the walk early and leave a partial
    /// type; only a failure to scan for the declaration is returned.
    pub fn get_type(&self, name: &str) -> TypedigResult<Option<Type>>
    {
        let _span = debug_span!("dwarf_type", name).entered();
        let Some(found) = self.find_type(name)? else {
            return Ok(None);
        };
        trace!(unit = found.unit, offset = found.offset.0, "declaration located");

        let mut deps = DependentTypes::new();
        let mut ty = Type::new(name);
        let mut static_fields = HashMap::new();

        if let Err(err) = self.build_members(found, &mut ty, &mut deps, &mut static_fields) {
            warn!(%err, "member list truncated");
        }
        if let Err(err) = self.merge_out_of_line(&mut ty, &mut deps, &static_fields) {
            warn!(%err, "out-of-line definitions not fully merged");
        }

        let mut dependents = deps.finish();
        dependents.retain(|dependent| dependent != name && dependent != ty.short_name());
        ty.dependent_types = dependents;
        Ok(Some(ty))
    }

    /// Qualified names of every complete class, and of structs when asked.
    pub fn type_names(&self, include_structs: bool) -> Vec<String>
    {
        let mut names = Vec::new();
        for unit in &self.units {
            let result = self.visit_scopes(unit, |entry, qualified| {
                let wanted = match entry.tag() {
                    constants::DW_TAG_class_type => true,
                    constants::DW_TAG_structure_type => include_structs,
                    _ => false,
                };
                if wanted && !flag(entry, constants::DW_AT_declaration)? {
                    names.push(qualified.to_string());
                }
                Ok(false)
            });
            if let Err(err) = result {
                debug!(%err, "type enumeration stopped early in unit");
            }
        }
        names.sort();
        names.dedup();
        names
    }

    /// Unit-level variables with a static address.
    pub fn global_variables(&self) -> Vec<Field>
    {
        let mut globals = Vec::new();
        for (index, unit) in self.units.iter().enumerate() {
            let result = unit
                .entries_tree(None)
                .map_err(|err| map_dwarf_error("building unit tree", err))
                .and_then(|mut tree| {
                    let root = tree.root().map_err(|err| map_dwarf_error("navigating unit root", err))?;
                    self.collect_globals(index, root.children(), &mut globals)
                });
            if let Err(err) = result {
                debug!(%err, "global variable scan stopped early in unit");
            }
        }
        globals
    }

    fn collect_globals(&self, unit_index: usize, mut children: EntriesTreeIter<'_, '_, '_, OwnedReader>, globals: &mut Vec<Field>) -> TypedigResult<()>
    {
        let unit = &self.units[unit_index];
        while let Some(child) = children
            .next()
            .map_err(|err| map_dwarf_error("iterating unit children", err))?
        {
            let entry = child.entry().clone();
            match entry.tag() {
                constants::DW_TAG_namespace => self.collect_globals(unit_index, child.children(), globals)?,
                constants::DW_TAG_variable => {
                    if self.attr_reference(unit_index, &entry, constants::DW_AT_specification)?.is_some()
                        || flag(&entry, constants::DW_AT_declaration)?
                    {
                        continue;
                    }
                    let Some(address) = self.location_address(unit, &entry)? else {
                        continue;
                    };
                    let Some(name) = self.entry_name(unit, &entry)? else {
                        continue;
                    };
                    let ty = resolve_optional(self, self.type_ref(unit_index, &entry)?, &mut DependentTypes::new());
                    globals.push(Field::static_at(name, ty, address));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Depth-first, pre-order search for a class or struct definition.
    fn find_type(&self, target: &str) -> TypedigResult<Option<DieRef>>
    {
        for (index, unit) in self.units.iter().enumerate() {
            let mut found = None;
            self.visit_scopes(unit, |entry, qualified| {
                if !matches!(entry.tag(), constants::DW_TAG_class_type | constants::DW_TAG_structure_type) {
                    return Ok(false);
                }
                let bare = qualified.rsplit("::").next().unwrap_or(qualified);
                if (qualified == target || bare == target) && !flag(entry, constants::DW_AT_declaration)? {
                    found = Some(DieRef {
                        unit: index,
                        offset: entry.offset(),
                    });
                    return Ok(true);
                }
                Ok(false)
            })?;
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    /// Call `visit` with every named namespace, class, struct and union of
    /// `unit` and its scope-qualified name, until `visit` returns `true`.
    fn visit_scopes<F>(&self, unit: &Unit<OwnedReader>, mut visit: F) -> TypedigResult<()>
    where
        F: FnMut(&Entry<'_, '_>, &str) -> TypedigResult<bool>,
    {
        let mut scopes: Vec<(isize, String)> = Vec::new();
        let mut depth = 0isize;
        let mut cursor = unit.entries();
        while let Some((delta, entry)) = cursor.next_dfs().map_err(|err| map_dwarf_error("traversing DIE tree", err))? {
            depth += delta;
            while scopes.last().is_some_and(|(scope_depth, _)| *scope_depth >= depth) {
                scopes.pop();
            }

            if !matches!(
                entry.tag(),
                constants::DW_TAG_namespace
                    | constants::DW_TAG_class_type
                    | constants::DW_TAG_structure_type
                    | constants::DW_TAG_union_type
            ) {
                continue;
            }
            let Some(name) = self.entry_name(unit, entry)? else {
                continue;
            };

            let mut qualified = String::new();
            for (_, scope) in &scopes {
                qualified.push_str(scope);
                qualified.push_str("::");
            }
            qualified.push_str(&name);

            if visit(entry, &qualified)? {
                return Ok(());
            }
            scopes.push((depth, name));
        }
        Ok(())
    }

    fn build_members(
        &self,
        found: DieRef,
        ty: &mut Type,
        deps: &mut DependentTypes,
        static_fields: &mut HashMap<DieRef, usize>,
    ) -> TypedigResult<()>
    {
        let unit = &self.units[found.unit];
        let mut tree = unit
            .entries_tree(Some(found.offset))
            .map_err(|err| map_dwarf_error("building class tree", err))?;
        let root = tree.root().map_err(|err| map_dwarf_error("navigating class root", err))?;
        let mut children = root.children();
        while let Some(child) = children
            .next()
            .map_err(|err| map_dwarf_error("iterating class children", err))?
        {
            let entry = child.entry().clone();
            let handle = DieRef {
                unit: found.unit,
                offset: entry.offset(),
            };

            let result = match entry.tag() {
                constants::DW_TAG_inheritance => self.base_name(found.unit, &entry).map(|base| {
                    if let Some(base) = base {
                        deps.add(base.clone());
                        ty.base_types.push(Type::stub(base));
                    }
                }),
                constants::DW_TAG_member | constants::DW_TAG_variable => self.field(found.unit, &entry, deps).map(|field| {
                    if field.is_static {
                        static_fields.insert(handle, ty.fields.len());
                    }
                    ty.fields.push(field);
                }),
                constants::DW_TAG_subprogram => self.method_skeleton(handle, &entry, &ty.name, deps).map(|method| {
                    ty.all_methods.push(method);
                }),
                _ => Ok(()),
            };

            if let Err(err) = result {
                debug!(offset = handle.offset.0, %err, "skipping malformed member");
            }
        }
        Ok(())
    }

    fn base_name(&self, unit_index: usize, entry: &Entry<'_, '_>) -> TypedigResult<Option<String>>
    {
        let Some(base) = self.type_ref(unit_index, entry)? else {
            return Ok(None);
        };
        let unit = &self.units[base.unit];
        let base_entry = unit
            .entry(base.offset)
            .map_err(|err| map_dwarf_error("resolving base class", err))?;
        self.entry_name(unit, &base_entry)
    }

    fn field(&self, unit_index: usize, entry: &Entry<'_, '_>, deps: &mut DependentTypes) -> TypedigResult<Field>
    {
        let unit = &self.units[unit_index];
        let name = self.entry_name(unit, entry)?.unwrap_or_default();
        let ty = resolve_optional(self, self.type_ref(unit_index, entry)?, deps);
        let is_static = entry.tag() == constants::DW_TAG_variable || flag(entry, constants::DW_AT_external)?;

        let field = if is_static {
            Field::static_at(name, ty, 0)
        } else {
            let offset = entry
                .attr_value(constants::DW_AT_data_member_location)
                .map_err(|err| map_dwarf_error("reading DW_AT_data_member_location", err))?
                .and_then(|value| match value {
                    AttributeValue::Exprloc(expression) => expression_constant(unit, expression),
                    other => other.udata_value(),
                })
                .unwrap_or(0);
            Field::instance(name, ty, offset)
        };
        Ok(field.with_accessibility(accessibility(entry)?))
    }

    fn method_skeleton(&self, handle: DieRef, entry: &Entry<'_, '_>, type_name: &str, deps: &mut DependentTypes) -> TypedigResult<Method>
    {
        let unit = &self.units[handle.unit];
        let name = self.entry_name(unit, entry)?.unwrap_or_default();
        let return_type = resolve_optional(self, self.type_ref(handle.unit, entry)?, deps);

        let mut method = Method::new(name, return_type);
        method.mangled_name = self.linkage_name(unit, entry)?.unwrap_or_default();
        method.accessibility = accessibility(entry)?;
        method.is_compiler_generated = flag(entry, constants::DW_AT_artificial)?;

        if let Some(value) = entry
            .attr_value(constants::DW_AT_virtuality)
            .map_err(|err| map_dwarf_error("reading DW_AT_virtuality", err))?
        {
            method.is_virtual = match value {
                AttributeValue::Virtuality(virtuality) => virtuality != constants::DW_VIRTUALITY_none,
                other => other.udata_value().is_some_and(|raw| raw != 0),
            };
        }
        if let Some(AttributeValue::Exprloc(expression)) = entry
            .attr_value(constants::DW_AT_vtable_elem_location)
            .map_err(|err| map_dwarf_error("reading DW_AT_vtable_elem_location", err))?
        {
            if let Some(slot) = expression_constant(unit, expression) {
                method.is_virtual = true;
                method.vftable_offset = i64::try_from(slot).unwrap_or(-1);
            }
        }

        let parameters = self.parameters(handle, deps)?;
        method.args = parameters.args;
        method.is_static = !parameters.has_object;
        method.is_variadic = parameters.variadic;
        method.apply_structor_rule(type_name);
        Ok(method)
    }

    /// Formal parameters of the subprogram at `handle`, artificial ones
    /// excluded.
    fn parameters(&self, handle: DieRef, deps: &mut DependentTypes) -> TypedigResult<Parameters>
    {
        let unit = &self.units[handle.unit];
        let mut parameters = Parameters::default();
        let mut tree = unit
            .entries_tree(Some(handle.offset))
            .map_err(|err| map_dwarf_error("building subprogram tree", err))?;
        let root = tree.root().map_err(|err| map_dwarf_error("navigating subprogram root", err))?;
        let mut children = root.children();
        while let Some(child) = children
            .next()
            .map_err(|err| map_dwarf_error("iterating subprogram children", err))?
        {
            let entry = child.entry();
            match entry.tag() {
                constants::DW_TAG_formal_parameter => {
                    if flag(entry, constants::DW_AT_artificial)? {
                        parameters.has_object = true;
                        continue;
                    }
                    let position = parameters.args.len() + 1;
                    let name = self
                        .entry_name(unit, entry)?
                        .unwrap_or_else(|| synthetic_arg_name(position));
                    let ty = resolve_optional(self, self.type_ref(handle.unit, entry)?, deps);
                    parameters.args.push(Argument::new(name, ty));
                }
                constants::DW_TAG_unspecified_parameters => parameters.variadic = true,
                _ => {}
            }
        }
        Ok(parameters)
    }

    fn merge_out_of_line(&self, ty: &mut Type, deps: &mut DependentTypes, static_fields: &HashMap<DieRef, usize>) -> TypedigResult<()>
    {
        let linkages: HashSet<String> = ty
            .all_methods
            .iter()
            .filter(|method| !method.mangled_name.is_empty())
            .map(|method| method.mangled_name.clone())
            .collect();

        let mut definitions = Vec::new();
        for (index, unit) in self.units.iter().enumerate() {
            let mut tree = unit
                .entries_tree(None)
                .map_err(|err| map_dwarf_error("building unit tree", err))?;
            let root = tree.root().map_err(|err| map_dwarf_error("navigating unit root", err))?;
            self.collect_definitions(index, root.children(), &linkages, ty, deps, static_fields, &mut definitions)?;
        }

        merge_by_linkage(ty, definitions);
        Ok(())
    }

    /// Scan unit-level (and namespace-level) entries that point back at a
    /// declaration through `DW_AT_specification`.
    #[allow(clippy::too_many_arguments)]
    fn collect_definitions(
        &self,
        unit_index: usize,
        mut children: EntriesTreeIter<'_, '_, '_, OwnedReader>,
        linkages: &HashSet<String>,
        ty: &mut Type,
        deps: &mut DependentTypes,
        static_fields: &HashMap<DieRef, usize>,
        definitions: &mut Vec<LinkedDefinition>,
    ) -> TypedigResult<()>
    {
        let unit = &self.units[unit_index];
        while let Some(child) = children
            .next()
            .map_err(|err| map_dwarf_error("iterating unit children", err))?
        {
            let entry = child.entry().clone();
            match entry.tag() {
                constants::DW_TAG_namespace => {
                    self.collect_definitions(unit_index, child.children(), linkages, ty, deps, static_fields, definitions)?;
                }
                constants::DW_TAG_subprogram => {
                    let Some(declaration) = self.attr_reference(unit_index, &entry, constants::DW_AT_specification)? else {
                        continue;
                    };
                    let declaration_unit = &self.units[declaration.unit];
                    let declaration_entry = declaration_unit
                        .entry(declaration.offset)
                        .map_err(|err| map_dwarf_error("resolving DW_AT_specification", err))?;
                    let Some(linkage) = self.linkage_name(declaration_unit, &declaration_entry)? else {
                        continue;
                    };
                    if !linkages.contains(&linkage) {
                        continue;
                    }

                    let body = DieRef {
                        unit: unit_index,
                        offset: entry.offset(),
                    };
                    let parameters = self.parameters(body, deps)?;
                    let address = match entry
                        .attr_value(constants::DW_AT_low_pc)
                        .map_err(|err| map_dwarf_error("reading DW_AT_low_pc", err))?
                    {
                        Some(value) => self
                            .dwarf
                            .attr_address(unit, value)
                            .map_err(|err| map_dwarf_error("resolving DW_AT_low_pc", err))?
                            .unwrap_or(0),
                        None => 0,
                    };
                    trace!(linkage = %linkage, address, "out-of-line body");
                    definitions.push(LinkedDefinition {
                        linkage_name: linkage,
                        args: parameters.args,
                        address,
                    });
                }
                constants::DW_TAG_variable => {
                    let Some(declaration) = self.attr_reference(unit_index, &entry, constants::DW_AT_specification)? else {
                        continue;
                    };
                    let field_index = match static_fields.get(&declaration) {
                        Some(index) => Some(*index),
                        None => self.static_field_by_linkage(unit_index, &entry, declaration, ty)?,
                    };
                    let Some(field_index) = field_index else {
                        continue;
                    };
                    if let Some(address) = self.location_address(unit, &entry)? {
                        if let Some(field) = ty.fields.get_mut(field_index) {
                            field.address = address;
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Match a static definition whose declaration lives in another unit's copy
    /// of the class, by decoding its linkage name.
    fn static_field_by_linkage(&self, unit_index: usize, entry: &Entry<'_, '_>, declaration: DieRef, ty: &Type) -> TypedigResult<Option<usize>>
    {
        let declaration_unit = &self.units[declaration.unit];
        let declaration_entry = declaration_unit
            .entry(declaration.offset)
            .map_err(|err| map_dwarf_error("resolving DW_AT_specification", err))?;
        let linkage = match self.linkage_name(&self.units[unit_index], entry)? {
            Some(linkage) => Some(linkage),
            None => self.linkage_name(declaration_unit, &declaration_entry)?,
        };
        let Some(linkage) = linkage else {
            return Ok(None);
        };

        let owner = normalize_type_name(&linkage);
        let member = normalize_member_name(&linkage);
        if owner != ty.name && owner.rsplit("::").next() != Some(ty.short_name()) {
            return Ok(None);
        }
        Ok(ty
            .fields
            .iter()
            .position(|field| field.is_static && field.name == member))
    }

    fn type_ref(&self, unit_index: usize, entry: &Entry<'_, '_>) -> TypedigResult<Option<DieRef>>
    {
        self.attr_reference(unit_index, entry, constants::DW_AT_type)
    }

    fn attr_reference(&self, unit_index: usize, entry: &Entry<'_, '_>, name: constants::DwAt) -> TypedigResult<Option<DieRef>>
    {
        let value = entry
            .attr_value(name)
            .map_err(|err| map_dwarf_error("reading DIE reference", err))?;
        Ok(value.and_then(|value| self.reference(unit_index, value)))
    }

    fn reference(&self, unit_index: usize, value: AttributeValue<OwnedReader>) -> Option<DieRef>
    {
        match value {
            AttributeValue::UnitRef(offset) => Some(DieRef {
                unit: unit_index,
                offset,
            }),
            AttributeValue::DebugInfoRef(offset) => {
                let target = UnitSectionOffset::from(offset);
                self.units.iter().enumerate().find_map(|(index, unit)| {
                    target.to_unit_offset(unit).map(|offset| DieRef { unit: index, offset })
                })
            }
            AttributeValue::DebugTypesRef(signature) => self.type_unit_for_signature(signature),
            _ => None,
        }
    }

    fn type_unit_for_signature(&self, signature: DebugTypeSignature) -> Option<DieRef>
    {
        self.units.iter().enumerate().find_map(|(index, unit)| match unit.header.type_() {
            UnitType::Type {
                type_signature,
                type_offset,
            }
            | UnitType::SplitType {
                type_signature,
                type_offset,
            } if type_signature == signature => Some(DieRef {
                unit: index,
                offset: type_offset,
            }),
            _ => None,
        })
    }

    fn entry_name(&self, unit: &Unit<OwnedReader>, entry: &Entry<'_, '_>) -> TypedigResult<Option<String>>
    {
        self.string_attr(unit, entry, constants::DW_AT_name)
    }

    fn linkage_name(&self, unit: &Unit<OwnedReader>, entry: &Entry<'_, '_>) -> TypedigResult<Option<String>>
    {
        if let Some(name) = self.string_attr(unit, entry, constants::DW_AT_linkage_name)? {
            return Ok(Some(name));
        }
        self.string_attr(unit, entry, constants::DW_AT_MIPS_linkage_name)
    }

    fn string_attr(&self, unit: &Unit<OwnedReader>, entry: &Entry<'_, '_>, name: constants::DwAt) -> TypedigResult<Option<String>>
    {
        let Some(value) = entry
            .attr_value(name)
            .map_err(|err| map_dwarf_error("reading string attribute", err))?
        else {
            return Ok(None);
        };
        let reader = self
            .dwarf
            .attr_string(unit, value)
            .map_err(|err| map_dwarf_error("resolving DWARF string", err))?;
        let owned = match reader.to_string() {
            Ok(cow) => cow.into_owned(),
            Err(_) => reader
                .to_string_lossy()
                .map_err(|err| map_dwarf_error("decoding DWARF string", err))?
                .into_owned(),
        };
        Ok(Some(owned))
    }

    /// Static address from a `DW_OP_addr`/`DW_OP_addrx` location.
    fn location_address(&self, unit: &Unit<OwnedReader>, entry: &Entry<'_, '_>) -> TypedigResult<Option<u64>>
    {
        let Some(AttributeValue::Exprloc(expression)) = entry
            .attr_value(constants::DW_AT_location)
            .map_err(|err| map_dwarf_error("reading DW_AT_location", err))?
        else {
            return Ok(None);
        };

        let mut operations = expression.operations(unit.encoding());
        let first = operations
            .next()
            .map_err(|err| map_dwarf_error("decoding DW_AT_location", err))?;
        match first {
            Some(Operation::Address { address }) => Ok(Some(address)),
            Some(Operation::AddressIndex { index }) => self
                .dwarf
                .address(unit, index)
                .map(Some)
                .map_err(|err| map_dwarf_error("resolving DW_OP_addrx", err)),
            _ => Ok(None),
        }
    }

    /// Element count of the outermost dimension of the array at `handle`.
    fn array_length(&self, handle: DieRef) -> TypedigResult<Option<u64>>
    {
        let unit = &self.units[handle.unit];
        let mut tree = unit
            .entries_tree(Some(handle.offset))
            .map_err(|err| map_dwarf_error("building array tree", err))?;
        let root = tree.root().map_err(|err| map_dwarf_error("navigating array root", err))?;
        let mut children = root.children();
        while let Some(child) = children
            .next()
            .map_err(|err| map_dwarf_error("iterating array dimensions", err))?
        {
            let entry = child.entry();
            if entry.tag() != constants::DW_TAG_subrange_type {
                continue;
            }
            if let Some(count) = entry
                .attr(constants::DW_AT_count)
                .map_err(|err| map_dwarf_error("reading DW_AT_count", err))?
                .and_then(|attr| attr.udata_value())
            {
                return Ok(Some(count));
            }
            let upper = entry
                .attr(constants::DW_AT_upper_bound)
                .map_err(|err| map_dwarf_error("reading DW_AT_upper_bound", err))?
                .and_then(|attr| attr.udata_value().and_then(|raw| i64::try_from(raw).ok()).or_else(|| attr.sdata_value()));
            return Ok(upper.and_then(|upper| u64::try_from(upper + 1).ok()));
        }
        Ok(None)
    }
}

impl TypeGraph for DwarfWalker<'_>
{
    type Handle = DieRef;

    fn node(&self, handle: DieRef) -> TypedigResult<TypeNode<DieRef>>
    {
        let Some(unit) = self.units.get(handle.unit) else {
            return Ok(TypeNode::Unknown);
        };
        let entry = unit
            .entry(handle.offset)
            .map_err(|err| map_dwarf_error("resolving type reference", err))?;
        let next = self.type_ref(handle.unit, &entry)?;

        let node = match entry.tag() {
            constants::DW_TAG_base_type | constants::DW_TAG_unspecified_type => match self.entry_name(unit, &entry)? {
                Some(name) => TypeNode::Base(name),
                None => TypeNode::Unknown,
            },
            constants::DW_TAG_class_type
            | constants::DW_TAG_structure_type
            | constants::DW_TAG_union_type
            | constants::DW_TAG_enumeration_type => match self.entry_name(unit, &entry)? {
                Some(name) => TypeNode::Named(name),
                None => TypeNode::Unknown,
            },
            constants::DW_TAG_pointer_type | constants::DW_TAG_ptr_to_member_type => TypeNode::Pointer(next),
            constants::DW_TAG_reference_type | constants::DW_TAG_rvalue_reference_type => TypeNode::Reference(next),
            constants::DW_TAG_const_type => TypeNode::Const(next),
            constants::DW_TAG_array_type => TypeNode::Array {
                element: next,
                length: self.array_length(handle)?,
            },
            constants::DW_TAG_typedef
            | constants::DW_TAG_volatile_type
            | constants::DW_TAG_restrict_type
            | constants::DW_TAG_atomic_type => TypeNode::Transparent(next),
            _ => TypeNode::Unknown,
        };
        Ok(node)
    }
}

fn flag(entry: &Entry<'_, '_>, name: constants::DwAt) -> TypedigResult<bool>
{
    let value = entry
        .attr_value(name)
        .map_err(|err| map_dwarf_error("reading flag attribute", err))?;
    Ok(matches!(value, Some(AttributeValue::Flag(true))))
}

fn accessibility(entry: &Entry<'_, '_>) -> TypedigResult<Accessibility>
{
    let value = entry
        .attr_value(constants::DW_AT_accessibility)
        .map_err(|err| map_dwarf_error("reading DW_AT_accessibility", err))?;
    Ok(match value {
        Some(AttributeValue::Accessibility(access)) => Accessibility::from_dwarf(access.0),
        Some(other) => other
            .udata_value()
            .and_then(|raw| u8::try_from(raw).ok())
            .map_or(Accessibility::None, Accessibility::from_dwarf),
        None => Accessibility::None,
    })
}

/// Constant of a `DW_OP_constu`/`DW_OP_plus_uconst` expression.
fn expression_constant(unit: &Unit<OwnedReader>, expression: gimli::Expression<OwnedReader>) -> Option<u64>
{
    let mut operations = expression.operations(unit.encoding());
    match operations.next().ok()? {
        Some(Operation::UnsignedConstant { value } | Operation::PlusConstant { value }) => Some(value),
        Some(Operation::SignedConstant { value }) => u64::try_from(value).ok(),
        _ => None,
    }
}

impl DieRef
{
    /// Placeholder used by tests that build graphs by hand.
    #[cfg(test)]
    pub(crate) fn new(unit: usize, offset: usize) -> Self
    {
        Self {
            unit,
            offset: UnitOffset(offset),
        }
    }
}
