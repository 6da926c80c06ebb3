use edgeframe::process_frame;

fn main() {
    println!("Testing edgeframe dependency resolution...");
    // Smallest valid call: a flat 4x4 frame, which must come back edge-free.
    match process_frame(4, 4, &[0u8; 16], 4) {
        Ok(rgba) => println!("Filtered 4x4 frame into {} RGBA bytes", rgba.len()),
        Err(e) => println!("Note: processing failed: {}", e),
    }
}
