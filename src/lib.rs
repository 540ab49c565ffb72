pub mod audio_engine;
pub mod soundboard;

mod messages;

#[cfg(feature = "python")]
mod python;

/// The Python module implemented in Rust.
#[cfg(feature = "python")]
#[pyo3::pymodule]
mod pisound {
    #[pymodule_export]
    use super::python::PySoundboard;
}
