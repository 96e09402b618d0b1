//! Rewrites a desktop GLSL 330 transition shader into the Vulkan-flavoured
//! GLSL 450 the GPU backend ingests, and reflects what it declares.
//!
//! Plain `uniform` declarations become members of one std140 block at
//! binding 0. Each `sampler2D` becomes a texture/sampler pair and keeps its
//! name through a `#define`, so shader bodies compile unchanged. `bool`
//! uniforms are backed by `uint` members behind a comparison `#define`, and
//! `gl_FragCoord` is rewritten to the bottom-left origin desktop GL uses.

use crate::compositing::domain::shader_program::{
    SamplerDecl, ShaderProgram, UniformDecl, UniformType,
};
use crate::shared::error::MergeError;

pub const UNIFORM_BLOCK_BINDING: u32 = 0;
pub const FULLSCREEN_QUAD_WGSL: &str = include_str!("shaders/fullscreen_quad.wgsl");

const BLOCK_NAME: &str = "TransitionUniforms";
const FRAG_COORD: &str = "gl_FragCoord";
const FLIPPED_FRAG_COORD: &str = "FRAG_COORD_GL";
const PRECISION_QUALIFIERS: [&str; 3] = ["lowp", "mediump", "highp"];

/// Binding of the texture half of the `index`-th declared sampler.
pub fn texture_binding(index: usize) -> u32 {
    1 + 2 * index as u32
}

/// Binding of the sampler half of the `index`-th declared sampler.
pub fn sampler_binding(index: usize) -> u32 {
    2 + 2 * index as u32
}

#[derive(Clone, Debug)]
pub struct TranslatedShader {
    /// Source handed to the GPU backend.
    pub source: String,
    pub program: ShaderProgram,
}

/// Translates `fragment_source` for a render target `target_height` pixels
/// tall. The height is baked in to flip `gl_FragCoord.y`.
pub fn translate(
    fragment_source: &str,
    target_height: u32,
) -> Result<TranslatedShader, MergeError> {
    let stripped = strip_comments(fragment_source);

    let mut uniforms: Vec<UniformDecl> = Vec::new();
    let mut samplers: Vec<SamplerDecl> = Vec::new();
    let mut body: Vec<String> = Vec::new();
    let mut pending: Option<String> = None;
    let mut depth: i32 = 0;
    let mut next_in = 0;
    let mut next_out = 0;

    for line in stripped.lines() {
        let trimmed = line.trim();

        if let Some(mut statement) = pending.take() {
            statement.push(' ');
            statement.push_str(trimmed);
            if statement.contains(';') {
                parse_uniform_statement(&statement, &mut uniforms, &mut samplers)?;
            } else {
                pending = Some(statement);
            }
            body.push(String::new());
            continue;
        }

        if depth == 0 {
            if trimmed.starts_with("#version") || trimmed.starts_with("precision ") {
                body.push(String::new());
                continue;
            }
            if starts_with_word(trimmed, "uniform") {
                if trimmed.contains(';') {
                    parse_uniform_statement(trimmed, &mut uniforms, &mut samplers)?;
                } else {
                    pending = Some(trimmed.to_string());
                }
                body.push(String::new());
                continue;
            }
            if starts_with_word(trimmed, "in") {
                body.push(format!("layout(location = {next_in}) {trimmed}"));
                next_in += 1;
                continue;
            }
            if starts_with_word(trimmed, "out") {
                body.push(format!("layout(location = {next_out}) {trimmed}"));
                next_out += 1;
                continue;
            }
        }

        depth += brace_delta(line);
        body.push(line.to_string());
    }

    if pending.is_some() {
        return Err(MergeError::ShaderCompile(
            "unterminated uniform declaration".to_string(),
        ));
    }

    for s in samplers.iter().filter(|s| !s.is_source_selector()) {
        log::warn!("Sampler '{}' is neither 'from' nor 'to'; it will read frame A", s.name);
    }

    let flips_frag_coord = body.iter().any(|line| contains_identifier(line, FRAG_COORD));
    if flips_frag_coord {
        for line in body.iter_mut() {
            *line = replace_identifier(line, FRAG_COORD, FLIPPED_FRAG_COORD);
        }
    }

    let mut source = header(&uniforms, &samplers);
    if flips_frag_coord {
        source.push_str(&format!(
            "#define {FLIPPED_FRAG_COORD} vec4({FRAG_COORD}.x, {target_height}.0 - {FRAG_COORD}.y, {FRAG_COORD}.zw)\n"
        ));
    }
    source.push_str(&body.join("\n"));
    source.push('\n');

    Ok(TranslatedShader {
        source,
        program: ShaderProgram {
            vertex_source: FULLSCREEN_QUAD_WGSL,
            fragment_source: fragment_source.to_string(),
            uniforms,
            samplers,
        },
    })
}

fn header(uniforms: &[UniformDecl], samplers: &[SamplerDecl]) -> String {
    let mut out = String::from("#version 450\n");

    if !uniforms.is_empty() {
        out.push_str(&format!(
            "layout(set = 0, binding = {UNIFORM_BLOCK_BINDING}, std140) uniform {BLOCK_NAME} {{\n"
        ));
        for u in uniforms {
            out.push_str(&format!("    {} {};\n", u.ty.block_glsl_name(), block_member(u)));
        }
        out.push_str("};\n");
    }

    for u in uniforms.iter().filter(|u| u.ty.is_bool()) {
        let comparison = match u.ty {
            UniformType::Vector(_, n) => format!("notEqual({}, uvec{n}(0u))", block_member(u)),
            _ => format!("({} != 0u)", block_member(u)),
        };
        out.push_str(&format!("#define {} {comparison}\n", u.name));
    }

    for (i, s) in samplers.iter().enumerate() {
        out.push_str(&format!(
            "layout(set = 0, binding = {}) uniform texture2D {}_texture;\n",
            texture_binding(i),
            s.name
        ));
        out.push_str(&format!(
            "layout(set = 0, binding = {}) uniform sampler {}_sampler;\n",
            sampler_binding(i),
            s.name
        ));
    }
    for s in samplers {
        out.push_str(&format!(
            "#define {0} sampler2D({0}_texture, {0}_sampler)\n",
            s.name
        ));
    }
    out
}

/// Name of the block member holding `u`; booleans hide behind a `#define`
/// carrying the declared name.
fn block_member(u: &UniformDecl) -> String {
    if u.ty.is_bool() {
        format!("{}_bits", u.name)
    } else {
        u.name.clone()
    }
}

fn parse_uniform_statement(
    statement: &str,
    uniforms: &mut Vec<UniformDecl>,
    samplers: &mut Vec<SamplerDecl>,
) -> Result<(), MergeError> {
    let (decl, rest) = statement
        .split_once(';')
        .ok_or_else(|| MergeError::ShaderCompile(format!("malformed uniform: {statement}")))?;
    if !rest.trim().is_empty() {
        return Err(MergeError::ShaderCompile(format!(
            "one uniform declaration per line expected: {statement}"
        )));
    }

    let decl = decl.trim().trim_start_matches("uniform").trim();
    let mut words = decl
        .split_whitespace()
        .skip_while(|w| PRECISION_QUALIFIERS.contains(w));
    let type_name = words
        .next()
        .ok_or_else(|| MergeError::ShaderCompile(format!("malformed uniform: {statement}")))?;
    let declarators = words.collect::<Vec<_>>().join(" ");

    if type_name == "sampler2D" {
        for declarator in split_top_level(&declarators) {
            let name = declarator_name(declarator, statement)?;
            if !samplers.iter().any(|s| s.name == name) {
                samplers.push(SamplerDecl::new(name));
            }
        }
        return Ok(());
    }

    let ty = UniformType::parse(type_name).ok_or_else(|| {
        MergeError::ShaderCompile(format!(
            "unsupported uniform type '{type_name}' in: {statement}"
        ))
    })?;

    for declarator in split_top_level(&declarators) {
        let (name_part, initializer) = match declarator.split_once('=') {
            Some((n, init)) => (n, Some(init.trim())),
            None => (declarator, None),
        };
        let name = declarator_name(name_part, statement)?;
        if uniforms.iter().any(|u| u.name == name) {
            continue;
        }

        let default = match initializer.map(|init| (init, parse_initializer(ty, init))) {
            Some((_, Some(values))) => values,
            Some((init, None)) => {
                log::warn!("Uniform '{name}' initializer '{init}' is not a constant; defaulting to zero");
                vec![0.0; ty.components()]
            }
            None => vec![0.0; ty.components()],
        };

        uniforms.push(UniformDecl {
            name: name.to_string(),
            ty,
            default,
        });
    }
    Ok(())
}

fn declarator_name<'a>(declarator: &'a str, statement: &str) -> Result<&'a str, MergeError> {
    let name = declarator.trim();
    if name.contains('[') {
        return Err(MergeError::ShaderCompile(format!(
            "array uniforms are not supported: {statement}"
        )));
    }
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(MergeError::ShaderCompile(format!(
            "malformed uniform: {statement}"
        )));
    }
    Ok(name)
}

/// Parses `1.0`, `vec2(1.0, 2.0)`, `vec3(0.5)` or `mat2(1.0)` into
/// column-major components.
fn parse_initializer(ty: UniformType, text: &str) -> Option<Vec<f64>> {
    let components = ty.components();

    if let Some(value) = parse_number(text) {
        return (components == 1).then(|| vec![value]);
    }

    let open = text.find('(')?;
    let inner = text.strip_suffix(')')?.get(open + 1..)?;
    if UniformType::parse(text[..open].trim()) != Some(ty) {
        return None;
    }
    let args = split_top_level(inner)
        .into_iter()
        .map(parse_number)
        .collect::<Option<Vec<f64>>>()?;

    match (ty, args.len()) {
        (_, n) if n == components => Some(args),
        (UniformType::Matrix(n), 1) => {
            let n = n as usize;
            Some((0..n * n).map(|i| if i % (n + 1) == 0 { args[0] } else { 0.0 }).collect())
        }
        (_, 1) => Some(vec![args[0]; components]),
        _ => None,
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    match text {
        "true" => return Some(1.0),
        "false" => return Some(0.0),
        _ => {}
    }
    let text = text
        .strip_suffix(['f', 'F', 'u', 'U'])
        .unwrap_or(text);
    text.parse::<f64>().ok()
}

/// Splits on commas that are not nested inside parentheses.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = text[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Byte offsets of `ident` in `line` where it stands as a whole identifier.
fn identifier_matches<'a>(line: &'a str, ident: &'a str) -> impl Iterator<Item = usize> + 'a {
    line.match_indices(ident).map(|(i, _)| i).filter(move |&i| {
        let before = line[..i].chars().next_back();
        let after = line[i + ident.len()..].chars().next();
        !before.is_some_and(is_identifier_char) && !after.is_some_and(is_identifier_char)
    })
}

fn contains_identifier(line: &str, ident: &str) -> bool {
    identifier_matches(line, ident).next().is_some()
}

fn replace_identifier(line: &str, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut last = 0;
    for i in identifier_matches(line, from) {
        out.push_str(&line[last..i]);
        out.push_str(to);
        last = i + from.len();
    }
    out.push_str(&line[last..]);
    out
}

fn starts_with_word(line: &str, word: &str) -> bool {
    line.strip_prefix(word)
        .is_some_and(|rest| rest.starts_with(char::is_whitespace))
}

fn brace_delta(line: &str) -> i32 {
    line.chars().fold(0, |d, c| match c {
        '{' => d + 1,
        '}' => d - 1,
        _ => d,
    })
}

/// Removes `//` and `/* */` comments, keeping newlines so line numbers in
/// diagnostics still point into the caller's source.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('/', Some('/')) => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            _ => out.push(c),
        }
    }
    out
}
