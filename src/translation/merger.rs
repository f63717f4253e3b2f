/*!
 * Reassembles translated chunks into one document.
 */

/// Separator placed between translated chunks
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// Join translated chunks in order. No chunk content is altered.
pub fn merge<S: AsRef<str>>(translated_chunks: &[S]) -> String {
    let mut output = String::with_capacity(
        translated_chunks
            .iter()
            .map(|chunk| chunk.as_ref().len() + CHUNK_SEPARATOR.len())
            .sum(),
    );

    for (i, chunk) in translated_chunks.iter().enumerate() {
        if i > 0 {
            output.push_str(CHUNK_SEPARATOR);
        }
        output.push_str(chunk.as_ref());
    }

    output
}
