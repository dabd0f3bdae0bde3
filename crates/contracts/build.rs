//! Generates the contract types from `schema/*.toml`.
//!
//! Output lands in `$OUT_DIR/generated.rs` and is included by `src/lib.rs`.
//! Editing a schema file triggers regeneration on the next build.

use std::{
    env,
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    entity: EntityDef,
    #[serde(default)]
    field: Vec<FieldDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EntityDef {
    name: String,
    table: String,
    collection: String,
    doc: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldDef {
    name: String,
    ident: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    unique: bool,
    #[serde(default)]
    filterable: bool,
    references: Option<String>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    min: Option<f64>,
    max: Option<f64>,
    #[serde(default)]
    one_of: Vec<String>,
}

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while", "gen",
];

const RESERVED: &[&str] = &["id", "created_at", "updated_at", "page", "per_page"];

struct Field {
    wire: String,
    ident: String,
    rust_type: &'static str,
    kind_variant: &'static str,
    is_copy: bool,
    def: FieldDef,
}

impl Field {
    fn from_def(entity: &str, def: FieldDef) -> Field {
        let ident = def.ident.clone().unwrap_or_else(|| def.name.clone());
        if KEYWORDS.contains(&ident.as_str()) {
            panic!(
                "{entity}.{}: field name is a Rust keyword, set `ident` in the schema",
                def.name
            );
        }
        if RESERVED.contains(&def.name.as_str()) || RESERVED.contains(&ident.as_str()) {
            panic!("{entity}.{}: field name is reserved", def.name);
        }
        let (rust_type, kind_variant, is_copy) = match def.kind.as_str() {
            "string" => ("String", "String", false),
            "integer" => ("i64", "Integer", true),
            "float" => ("f64", "Float", true),
            "boolean" => ("bool", "Boolean", true),
            "date" => ("NaiveDate", "Date", true),
            "reference" => ("Uuid", "Reference", true),
            other => panic!("{entity}.{}: unknown field type `{other}`", def.name),
        };
        if def.kind == "reference" && def.references.is_none() {
            panic!("{entity}.{}: reference fields need `references`", def.name);
        }
        Field {
            wire: def.name.clone(),
            ident,
            rust_type,
            kind_variant,
            is_copy,
            def,
        }
    }

    fn serde_attr(&self, out: &mut String, indent: &str) {
        if self.wire != self.ident {
            writeln!(out, "{indent}#[serde(rename = {:?})]", self.wire).unwrap();
        }
    }

    fn copy_from(&self, source: &str) -> String {
        if self.is_copy {
            format!("{source}.{}", self.ident)
        } else {
            format!("{source}.{}.clone()", self.ident)
        }
    }
}

fn opt<T: std::fmt::Debug>(value: &Option<T>) -> String {
    match value {
        Some(v) => format!("Some({v:?})"),
        None => "None".to_string(),
    }
}

fn to_snake(name: &str) -> String {
    let mut out = String::new();
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn generate_entity(out: &mut String, schema: SchemaFile) -> (String, String) {
    let entity = schema.entity;
    let name = entity.name.clone();
    let schema_const = format!("{}_SCHEMA", to_snake(&name).to_uppercase());
    let fields: Vec<Field> = schema
        .field
        .into_iter()
        .map(|def| Field::from_def(&name, def))
        .collect();

    // Static schema description.
    writeln!(out, "/// Contract schema of [`{name}`].").unwrap();
    writeln!(out, "pub const {schema_const}: EntitySchema = EntitySchema {{").unwrap();
    writeln!(out, "    name: {:?},", entity.name).unwrap();
    writeln!(out, "    table: {:?},", entity.table).unwrap();
    writeln!(out, "    collection: {:?},", entity.collection).unwrap();
    writeln!(out, "    fields: &[").unwrap();
    for f in &fields {
        let one_of = f
            .def
            .one_of
            .iter()
            .map(|v| format!("{v:?}"))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(out, "        FieldSchema {{").unwrap();
        writeln!(out, "            name: {:?},", f.wire).unwrap();
        writeln!(out, "            column: {:?},", f.ident).unwrap();
        writeln!(out, "            kind: FieldKind::{},", f.kind_variant).unwrap();
        writeln!(out, "            required: {},", f.def.required).unwrap();
        writeln!(out, "            unique: {},", f.def.unique).unwrap();
        writeln!(out, "            filterable: {},", f.def.filterable).unwrap();
        writeln!(out, "            references: {},", opt(&f.def.references)).unwrap();
        writeln!(out, "            rules: Rules {{").unwrap();
        writeln!(out, "                min_length: {},", opt(&f.def.min_length)).unwrap();
        writeln!(out, "                max_length: {},", opt(&f.def.max_length)).unwrap();
        writeln!(out, "                min: {},", opt(&f.def.min)).unwrap();
        writeln!(out, "                max: {},", opt(&f.def.max)).unwrap();
        writeln!(out, "                one_of: &[{one_of}],").unwrap();
        writeln!(out, "            }},").unwrap();
        writeln!(out, "        }},").unwrap();
    }
    writeln!(out, "    ],").unwrap();
    writeln!(out, "}};\n").unwrap();

    // Domain entity.
    if let Some(doc) = &entity.doc {
        writeln!(out, "#[doc = {doc:?}]").unwrap();
    }
    writeln!(out, "#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]").unwrap();
    writeln!(out, "#[cfg_attr(feature = \"sqlx\", derive(sqlx::FromRow))]").unwrap();
    writeln!(out, "pub struct {name} {{").unwrap();
    writeln!(out, "    pub id: Uuid,").unwrap();
    for f in &fields {
        f.serde_attr(out, "    ");
        if f.def.required {
            writeln!(out, "    pub {}: {},", f.ident, f.rust_type).unwrap();
        } else {
            writeln!(out, "    pub {}: Option<{}>,", f.ident, f.rust_type).unwrap();
        }
    }
    writeln!(out, "    pub created_at: DateTime<Utc>,").unwrap();
    writeln!(out, "    pub updated_at: DateTime<Utc>,").unwrap();
    writeln!(out, "}}\n").unwrap();

    // Wire DTOs: every field optional so missing fields surface as validation errors.
    for (dto, doc) in [
        (format!("Create{name}"), "Request body for creating or fully replacing"),
        (format!("Update{name}"), "Request body for a partial update of"),
    ] {
        writeln!(out, "/// {doc} [`{name}`].").unwrap();
        writeln!(
            out,
            "#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]"
        )
        .unwrap();
        writeln!(out, "pub struct {dto} {{").unwrap();
        for f in &fields {
            f.serde_attr(out, "    ");
            writeln!(out, "    pub {}: Option<{}>,", f.ident, f.rust_type).unwrap();
        }
        writeln!(out, "}}\n").unwrap();
    }

    // Query filter.
    let filter = format!("{name}Filter");
    writeln!(out, "/// Query parameters accepted when listing [`{name}`] records.").unwrap();
    writeln!(
        out,
        "#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]"
    )
    .unwrap();
    writeln!(out, "pub struct {filter} {{").unwrap();
    let filterable: Vec<&Field> = fields.iter().filter(|f| f.def.filterable).collect();
    for f in &filterable {
        if f.wire != f.ident {
            writeln!(
                out,
                "    #[serde(rename = {:?}, skip_serializing_if = \"Option::is_none\")]",
                f.wire
            )
            .unwrap();
        } else {
            writeln!(out, "    #[serde(skip_serializing_if = \"Option::is_none\")]").unwrap();
        }
        writeln!(out, "    pub {}: Option<{}>,", f.ident, f.rust_type).unwrap();
    }
    writeln!(out, "    #[serde(skip_serializing_if = \"Option::is_none\")]").unwrap();
    writeln!(out, "    pub page: Option<u32>,").unwrap();
    writeln!(out, "    #[serde(skip_serializing_if = \"Option::is_none\")]").unwrap();
    writeln!(out, "    pub per_page: Option<u32>,").unwrap();
    writeln!(out, "}}\n").unwrap();

    // Validated shapes.
    let new = format!("New{name}");
    let patch = format!("{name}Patch");
    writeln!(out, "/// Validated input for creating or replacing a [`{name}`].").unwrap();
    writeln!(out, "#[derive(Debug, Clone, PartialEq)]").unwrap();
    writeln!(out, "pub struct {new} {{").unwrap();
    for f in &fields {
        if f.def.required {
            writeln!(out, "    pub {}: {},", f.ident, f.rust_type).unwrap();
        } else {
            writeln!(out, "    pub {}: Option<{}>,", f.ident, f.rust_type).unwrap();
        }
    }
    writeln!(out, "}}\n").unwrap();

    writeln!(out, "/// Validated partial update of a [`{name}`]; `None` keeps the stored value.").unwrap();
    writeln!(out, "#[derive(Debug, Clone, Default, PartialEq)]").unwrap();
    writeln!(out, "pub struct {patch} {{").unwrap();
    for f in &fields {
        writeln!(out, "    pub {}: Option<{}>,", f.ident, f.rust_type).unwrap();
    }
    writeln!(out, "}}\n").unwrap();

    // Create validation.
    let required: Vec<&Field> = fields.iter().filter(|f| f.def.required).collect();
    writeln!(out, "impl Create{name} {{").unwrap();
    writeln!(
        out,
        "    pub fn validate(self) -> Result<{new}, ValidationErrors> {{"
    )
    .unwrap();
    writeln!(out, "        let fields = {schema_const}.fields;").unwrap();
    writeln!(out, "        let mut errors = ValidationErrors::default();").unwrap();
    for (i, f) in fields.iter().enumerate() {
        let check = if f.def.required { "required" } else { "optional" };
        writeln!(
            out,
            "        let {ident} = errors.{check}(&fields[{i}], self.{ident});",
            ident = f.ident
        )
        .unwrap();
    }
    let build_new = format!(
        "{new} {{ {} }}",
        fields
            .iter()
            .map(|f| f.ident.clone())
            .collect::<Vec<_>>()
            .join(", ")
    );
    if required.is_empty() {
        writeln!(out, "        errors.into_result()?;").unwrap();
        writeln!(out, "        Ok({build_new})").unwrap();
    } else {
        let idents = required
            .iter()
            .map(|f| f.ident.clone())
            .collect::<Vec<_>>()
            .join(", ");
        let somes = required
            .iter()
            .map(|f| format!("Some({})", f.ident))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(out, "        match ({idents},) {{").unwrap();
        writeln!(
            out,
            "            ({somes},) if errors.is_empty() => Ok({build_new}),"
        )
        .unwrap();
        writeln!(out, "            _ => Err(errors),").unwrap();
        writeln!(out, "        }}").unwrap();
    }
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}\n").unwrap();

    // Update validation.
    writeln!(out, "impl Update{name} {{").unwrap();
    writeln!(
        out,
        "    pub fn validate(self) -> Result<{patch}, ValidationErrors> {{"
    )
    .unwrap();
    writeln!(out, "        let fields = {schema_const}.fields;").unwrap();
    writeln!(out, "        let mut errors = ValidationErrors::default();").unwrap();
    writeln!(out, "        let patch = {patch} {{").unwrap();
    for (i, f) in fields.iter().enumerate() {
        writeln!(
            out,
            "            {ident}: errors.optional(&fields[{i}], self.{ident}),",
            ident = f.ident
        )
        .unwrap();
    }
    writeln!(out, "        }};").unwrap();
    writeln!(out, "        errors.into_result()?;").unwrap();
    writeln!(out, "        Ok(patch)").unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}\n").unwrap();

    // Filter validation.
    writeln!(out, "impl {filter} {{").unwrap();
    writeln!(
        out,
        "    pub fn validate(&self) -> Result<PageRequest, ValidationErrors> {{"
    )
    .unwrap();
    if filterable.is_empty() {
        writeln!(out, "        PageRequest::resolve(self.page, self.per_page)").unwrap();
    } else {
        writeln!(out, "        let fields = {schema_const}.fields;").unwrap();
        writeln!(out, "        let mut errors = ValidationErrors::default();").unwrap();
        for f in &filterable {
            let index = fields
                .iter()
                .position(|other| other.ident == f.ident)
                .unwrap();
            writeln!(
                out,
                "        errors.optional(&fields[{index}], self.{}.as_ref().cloned());",
                f.ident
            )
            .unwrap();
        }
        writeln!(
            out,
            "        let page = PageRequest::resolve(self.page, self.per_page);"
        )
        .unwrap();
        writeln!(out, "        match page {{").unwrap();
        writeln!(out, "            Ok(page) if errors.is_empty() => Ok(page),").unwrap();
        writeln!(out, "            Ok(_) => Err(errors),").unwrap();
        writeln!(out, "            Err(page_errors) => {{").unwrap();
        writeln!(out, "                errors.errors.extend(page_errors.errors);").unwrap();
        writeln!(out, "                Err(errors)").unwrap();
        writeln!(out, "            }}").unwrap();
        writeln!(out, "        }}").unwrap();
    }
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}\n").unwrap();

    // Patch helpers.
    writeln!(out, "impl {patch} {{").unwrap();
    writeln!(out, "    pub fn is_empty(&self) -> bool {{").unwrap();
    let empties = fields
        .iter()
        .map(|f| format!("self.{}.is_none()", f.ident))
        .collect::<Vec<_>>();
    if empties.is_empty() {
        writeln!(out, "        true").unwrap();
    } else {
        writeln!(out, "        {}", empties.join(" && ")).unwrap();
    }
    writeln!(out, "    }}\n").unwrap();
    writeln!(out, "    pub fn apply(self, base: {new}) -> {new} {{").unwrap();
    writeln!(out, "        {new} {{").unwrap();
    for f in &fields {
        if f.def.required {
            writeln!(
                out,
                "            {ident}: self.{ident}.unwrap_or(base.{ident}),",
                ident = f.ident
            )
            .unwrap();
        } else {
            writeln!(
                out,
                "            {ident}: self.{ident}.or(base.{ident}),",
                ident = f.ident
            )
            .unwrap();
        }
    }
    writeln!(out, "        }}").unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}\n").unwrap();

    // Conversions used by the DTO round trip and by clients building forms.
    writeln!(out, "impl From<&{name}> for {new} {{").unwrap();
    writeln!(out, "    fn from(entity: &{name}) -> Self {{").unwrap();
    writeln!(out, "        {new} {{").unwrap();
    for f in &fields {
        writeln!(out, "            {}: {},", f.ident, f.copy_from("entity")).unwrap();
    }
    writeln!(out, "        }}").unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}\n").unwrap();

    writeln!(out, "impl From<{new}> for Create{name} {{").unwrap();
    writeln!(out, "    fn from(value: {new}) -> Self {{").unwrap();
    writeln!(out, "        Create{name} {{").unwrap();
    for f in &fields {
        if f.def.required {
            writeln!(out, "            {ident}: Some(value.{ident}),", ident = f.ident).unwrap();
        } else {
            writeln!(out, "            {ident}: value.{ident},", ident = f.ident).unwrap();
        }
    }
    writeln!(out, "        }}").unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}\n").unwrap();

    writeln!(out, "impl From<&{name}> for Create{name} {{").unwrap();
    writeln!(out, "    fn from(entity: &{name}) -> Self {{").unwrap();
    writeln!(out, "        {new}::from(entity).into()").unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}\n").unwrap();

    writeln!(out, "impl Contract for {name} {{").unwrap();
    writeln!(out, "    type Create = Create{name};").unwrap();
    writeln!(out, "    type Update = Update{name};").unwrap();
    writeln!(out, "    type New = {new};").unwrap();
    writeln!(out, "    type Patch = {patch};").unwrap();
    writeln!(out, "    type Filter = {filter};").unwrap();
    writeln!(out, "    const SCHEMA: &'static EntitySchema = &{schema_const};\n").unwrap();
    writeln!(out, "    fn id(&self) -> Uuid {{").unwrap();
    writeln!(out, "        self.id").unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}\n").unwrap();

    (name, schema_const)
}

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let schema_dir = manifest_dir.join("schema");
    println!("cargo:rerun-if-changed={}", schema_dir.display());

    let mut paths: Vec<PathBuf> = fs::read_dir(&schema_dir)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", schema_dir.display()))
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();

    let mut out = String::new();
    out.push_str("// @generated by contracts/build.rs from schema/*.toml. Do not edit.\n\n");
    let mut entities = Vec::new();
    for path in &paths {
        println!("cargo:rerun-if-changed={}", path.display());
        entities.push(generate_entity(&mut out, parse(path)));
    }

    writeln!(out, "/// Every entity schema, in file order.").unwrap();
    writeln!(out, "pub const SCHEMAS: &[&EntitySchema] = &[").unwrap();
    for (_, schema_const) in &entities {
        writeln!(out, "    &{schema_const},").unwrap();
    }
    writeln!(out, "];\n").unwrap();

    writeln!(out, "/// TypeScript declarations of every generated wire type.").unwrap();
    writeln!(out, "pub fn generated_declarations() -> Vec<String> {{").unwrap();
    writeln!(out, "    vec![").unwrap();
    for (name, _) in &entities {
        for ty in [
            name.clone(),
            format!("Create{name}"),
            format!("Update{name}"),
            format!("{name}Filter"),
        ] {
            writeln!(out, "        {ty}::decl(),").unwrap();
        }
    }
    writeln!(out, "    ]").unwrap();
    writeln!(out, "}}").unwrap();

    let out_path = PathBuf::from(env::var("OUT_DIR").unwrap()).join("generated.rs");
    fs::write(&out_path, out)
        .unwrap_or_else(|e| panic!("cannot write {}: {e}", out_path.display()));
}

fn parse(path: &Path) -> SchemaFile {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    toml::from_str(&text).unwrap_or_else(|e| panic!("invalid schema {}: {e}", path.display()))
}
