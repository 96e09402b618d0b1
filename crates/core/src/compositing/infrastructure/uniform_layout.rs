use crate::compositing::domain::shader_program::{ScalarKind, UniformDecl, UniformType};

const VEC4_ALIGN: usize = 16;
const SCALAR_SIZE: usize = 4;

/// Byte position of one uniform inside the std140 block.
#[derive(Clone, Debug, PartialEq)]
pub struct UniformSlot {
    pub name: String,
    pub ty: UniformType,
    pub offset: usize,
}

/// std140 layout of the transition uniform block, in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct UniformLayout {
    slots: Vec<UniformSlot>,
    size: usize,
}

fn align_of(ty: UniformType) -> usize {
    match ty {
        UniformType::Scalar(_) => SCALAR_SIZE,
        UniformType::Vector(_, 2) => 2 * SCALAR_SIZE,
        UniformType::Vector(_, _) | UniformType::Matrix(_) => VEC4_ALIGN,
    }
}

fn size_of(ty: UniformType) -> usize {
    match ty {
        UniformType::Scalar(_) => SCALAR_SIZE,
        UniformType::Vector(_, n) => n as usize * SCALAR_SIZE,
        // Each column is padded to a vec4.
        UniformType::Matrix(n) => n as usize * VEC4_ALIGN,
    }
}

impl UniformLayout {
    pub fn std140(decls: &[UniformDecl]) -> Self {
        let mut cursor: usize = 0;
        let slots = decls
            .iter()
            .map(|d| {
                let offset = cursor.next_multiple_of(align_of(d.ty));
                cursor = offset + size_of(d.ty);
                UniformSlot {
                    name: d.name.clone(),
                    ty: d.ty,
                    offset,
                }
            })
            .collect();

        Self {
            slots,
            size: cursor.next_multiple_of(VEC4_ALIGN).max(VEC4_ALIGN),
        }
    }

    /// Buffer size in bytes; never zero so an empty block still binds.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn slot(&self, name: &str) -> Option<&UniformSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    /// A buffer holding every declaration's default value.
    pub fn defaults(&self, decls: &[UniformDecl]) -> Vec<u8> {
        let mut buffer = vec![0u8; self.size];
        for d in decls {
            self.write(&mut buffer, &d.name, &d.default);
        }
        buffer
    }

    /// Writes `values` (column-major for matrices) into the slot for `name`.
    /// Returns false without touching the buffer when the name is unknown
    /// or the component count does not match the declared type.
    pub fn write(&self, buffer: &mut [u8], name: &str, values: &[f64]) -> bool {
        let Some(slot) = self.slot(name) else {
            return false;
        };
        if values.len() != slot.ty.components() {
            return false;
        }

        for (i, &value) in values.iter().enumerate() {
            let offset = match slot.ty {
                UniformType::Matrix(n) => {
                    let n = n as usize;
                    slot.offset + (i / n) * VEC4_ALIGN + (i % n) * SCALAR_SIZE
                }
                _ => slot.offset + i * SCALAR_SIZE,
            };
            let target = &mut buffer[offset..offset + SCALAR_SIZE];
            match slot.ty.scalar_kind() {
                ScalarKind::Float => target.copy_from_slice(bytemuck::bytes_of(&(value as f32))),
                ScalarKind::Int => {
                    target.copy_from_slice(bytemuck::bytes_of(&(value.round() as i32)))
                }
                ScalarKind::Uint => {
                    target.copy_from_slice(bytemuck::bytes_of(&(value.round().max(0.0) as u32)))
                }
                ScalarKind::Bool => {
                    target.copy_from_slice(bytemuck::bytes_of(&u32::from(value != 0.0)))
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn decl(name: &str, glsl: &str) -> UniformDecl {
        let ty = UniformType::parse(glsl).unwrap();
        UniformDecl {
            name: name.to_string(),
            ty,
            default: vec![0.0; ty.components()],
        }
    }

    fn f32_at(buffer: &[u8], offset: usize) -> f32 {
        bytemuck::pod_read_unaligned::<f32>(&buffer[offset..offset + 4])
    }

    #[test]
    fn test_std140_offsets() {
        let decls = vec![
            decl("progress", "float"),
            decl("resolution", "vec2"),
            decl("tint", "vec3"),
            decl("amount", "float"),
            decl("rot", "mat2"),
            decl("steps", "int"),
        ];
        let layout = UniformLayout::std140(&decls);
        let offsets: Vec<usize> = decls
            .iter()
            .map(|d| layout.slot(&d.name).unwrap().offset)
            .collect();
        assert_eq!(offsets, vec![0, 8, 16, 28, 32, 64]);
        assert_eq!(layout.size(), 80);
    }

    #[test]
    fn test_empty_layout_has_minimum_size() {
        assert_eq!(UniformLayout::std140(&[]).size(), 16);
    }

    #[test]
    fn test_write_vector() {
        let decls = vec![decl("progress", "float"), decl("resolution", "vec2")];
        let layout = UniformLayout::std140(&decls);
        let mut buffer = vec![0u8; layout.size()];
        assert!(layout.write(&mut buffer, "resolution", &[1280.0, 720.0]));
        assert_relative_eq!(f32_at(&buffer, 8), 1280.0);
        assert_relative_eq!(f32_at(&buffer, 12), 720.0);
    }

    #[test]
    fn test_write_bool_as_uint() {
        let decls = vec![decl("swap", "bool"), decl("mirror", "bvec2")];
        let layout = UniformLayout::std140(&decls);
        assert_eq!(layout.slot("mirror").unwrap().offset, 8);

        let mut buffer = vec![0xffu8; layout.size()];
        assert!(layout.write(&mut buffer, "swap", &[0.0]));
        assert!(layout.write(&mut buffer, "mirror", &[0.25, 0.0]));
        let u32_at = |offset: usize| bytemuck::pod_read_unaligned::<u32>(&buffer[offset..offset + 4]);
        assert_eq!(u32_at(0), 0);
        assert_eq!(u32_at(8), 1);
        assert_eq!(u32_at(12), 0);
    }

    #[test]
    fn test_write_matrix_pads_columns() {
        let layout = UniformLayout::std140(&[decl("m", "mat2")]);
        let mut buffer = vec![0u8; layout.size()];
        assert!(layout.write(&mut buffer, "m", &[1.0, 2.0, 3.0, 4.0]));
        assert_relative_eq!(f32_at(&buffer, 0), 1.0);
        assert_relative_eq!(f32_at(&buffer, 4), 2.0);
        assert_relative_eq!(f32_at(&buffer, 16), 3.0);
        assert_relative_eq!(f32_at(&buffer, 20), 4.0);
    }

    #[test]
    fn test_write_int_rounds() {
        let layout = UniformLayout::std140(&[decl("steps", "int")]);
        let mut buffer = vec![0u8; layout.size()];
        assert!(layout.write(&mut buffer, "steps", &[2.6]));
        assert_eq!(bytemuck::pod_read_unaligned::<i32>(&buffer[0..4]), 3);
    }

    #[test]
    fn test_shape_mismatch_leaves_buffer_untouched() {
        let layout = UniformLayout::std140(&[decl("resolution", "vec2")]);
        let mut buffer = vec![0u8; layout.size()];
        assert!(!layout.write(&mut buffer, "resolution", &[1.0]));
        assert!(!layout.write(&mut buffer, "missing", &[1.0]));
        assert!(buffer.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_defaults_are_written() {
        let mut strength = decl("strength", "float");
        strength.default = vec![0.5];
        let decls = vec![decl("progress", "float"), strength];
        let layout = UniformLayout::std140(&decls);
        let buffer = layout.defaults(&decls);
        assert_relative_eq!(f32_at(&buffer, 0), 0.0);
        assert_relative_eq!(f32_at(&buffer, 4), 0.5);
    }
}
