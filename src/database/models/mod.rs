//! Collection bindings: one module per collection.

pub mod cargo_policial;
pub mod categoria_licencia;
pub mod queja;
pub mod usuario;

pub use cargo_policial::CARGOS_POLICIALES;
pub use categoria_licencia::CATEGORIAS_LICENCIA;
pub use queja::QUEJAS;
pub use usuario::{NewUsuario, Usuario, USUARIOS};
