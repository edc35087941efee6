use image::{GrayImage, Luma};

fn main() {
    let path = std::env::args().nth(1).expect("usage: dccgray <file.dcc>");

    let mut dcc = arreat_dcc::Dcc::open(&path).expect("Failed to open DCC file");
    dcc.decode().expect("Failed to decode DCC header");

    println!(
        "{}: {} directions, {} frames each",
        path,
        dcc.direction_count().unwrap(),
        dcc.frames_per_direction().unwrap()
    );

    let direction = dcc.read_direction(0).expect("Failed to decode direction 0");
    let frame = &direction.frames[0];
    println!("frame 0: {}x{}", frame.width, frame.height);

    // Dump the raw palette indices as luma; real rendering would map them
    // through the sprite's 256-entry RGB palette instead.
    let mut gray = GrayImage::new(frame.width, frame.height);
    for y in 0..frame.height {
        for x in 0..frame.width {
            let index = frame.data[(y * frame.width + x) as usize];
            gray.put_pixel(x, y, Luma([index]));
        }
    }

    gray.save("out.png").expect("Failed to save PNG");
    println!("Saved: out.png");
}
