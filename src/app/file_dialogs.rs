// file_dialogs.rs
use crate::app::error::{ConverterError, ConverterResult};
use crate::app::OutputFormat;
use rfd::FileDialog;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn select_webp_image() -> Option<PathBuf> {
    FileDialog::new().add_filter("WEBP Image", &["webp"]).pick_file()
}

pub fn select_save_path(file_name: &str, format: OutputFormat) -> Option<PathBuf> {
    FileDialog::new()
        .set_file_name(file_name)
        .add_filter(format.label(), &[format.extension()])
        .save_file()
}

pub fn write_output(bytes: &[u8], output_path: &Path) -> ConverterResult<()> {
    let mut file = File::create(output_path).map_err(ConverterError::SaveFailure)?;
    file.write_all(bytes).map_err(ConverterError::SaveFailure)?;
    file.flush().map_err(ConverterError::SaveFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_bytes_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("converted_image.jpg");

        write_output(b"\xFF\xD8\xFF", &path).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"\xFF\xD8\xFF");
    }

    #[test]
    fn unwritable_path_is_a_save_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_output(b"x", &dir.path().join("no/such/dir/out.png")).unwrap_err();
        assert!(matches!(err, ConverterError::SaveFailure(_)));
    }
}
