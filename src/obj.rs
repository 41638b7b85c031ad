use std::{io::BufRead, path::Path};

use glam::DVec3;

use crate::{error::Error, surface::TriangleSurface};

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    }
}

fn from_models(models: Vec<tobj::Model>) -> Result<TriangleSurface, Error> {
    let (npoints, ntris) = models.iter().fold((0usize, 0usize), |(np, nt), model| {
        (np + model.mesh.positions.len() / 3, nt + model.mesh.indices.len() / 3)
    });
    let mut points = Vec::with_capacity(npoints);
    let mut triangles = Vec::with_capacity(ntris);
    for model in models {
        let mesh = model.mesh;
        if mesh.positions.len() % 3 != 0 {
            return Err(Error::IncorrectNumberOfCoordinates(mesh.positions.len()));
        }
        let offset = points.len() as u32;
        points.extend(
            mesh.positions
                .chunks_exact(3)
                .map(|xyz| DVec3::new(xyz[0], xyz[1], xyz[2])),
        );
        triangles.extend(
            mesh.indices
                .chunks_exact(3)
                .map(|tri| [tri[0] + offset, tri[1] + offset, tri[2] + offset]),
        );
    }
    TriangleSurface::new(points, triangles)
}

impl TriangleSurface {
    /// Load the reference surface from a Wavefront OBJ file. Polygons are
    /// triangulated, materials are ignored.
    pub fn load_obj(path: &Path) -> Result<Self, Error> {
        let (models, _) = tobj::load_obj(path, &load_options())
            .map_err(|e| Error::ObjLoadFailed(format!("{}", e)))?;
        from_models(models)
    }

    /// Same as [`TriangleSurface::load_obj`], but reads from a buffer.
    pub fn from_obj_buf<B: BufRead>(reader: &mut B) -> Result<Self, Error> {
        let (models, _) = tobj::load_obj_buf(reader, &load_options(), |_| {
            Err(tobj::LoadError::OpenFileFailed)
        })
        .map_err(|e| Error::ObjLoadFailed(format!("{}", e)))?;
        from_models(models)
    }
}
