/// Leading bytes of every PDF file.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// True iff `bytes` starts with the PDF magic header. Short buffers are not PDFs.
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.len() >= PDF_MAGIC.len() && &bytes[..PDF_MAGIC.len()] == PDF_MAGIC
}

/// The first four bytes, for logging what a rejected buffer actually held.
pub fn leading_bytes(bytes: &[u8]) -> String {
    let n = bytes.len().min(PDF_MAGIC.len());
    String::from_utf8_lossy(&bytes[..n]).escape_debug().to_string()
}
