use super::*;

#[test]
fn new_image_is_blank() {
    let image = Image::new(4, 3);
    assert_eq!(image.resolution(), Resolution::new(4, 3));
    assert!(image.is_blank());
    assert_eq!(image.data().len(), 4 * 3 * 4);
}

#[test]
fn clear_and_resize() {
    let mut image = Image::new(2, 2);
    image.clear(Color::RED);
    assert_eq!(image.get(1, 1), Color::RED);
    assert!(!image.is_blank());

    // Same size: contents are kept.
    image.resize(Resolution::new(2, 2));
    assert_eq!(image.get(0, 0), Color::RED);

    image.resize(Resolution::new(5, 1));
    assert_eq!(image.resolution(), Resolution::new(5, 1));
    assert!(image.is_blank());
}

#[test]
fn out_of_bounds_writes_are_ignored() {
    let mut image = Image::new(3, 3);
    image.set(-1, 0, Color::WHITE);
    image.set(0, 3, Color::WHITE);
    image.set(3, 0, Color::WHITE);
    assert!(image.is_blank());

    image.set(2, 2, Color::WHITE);
    assert_eq!(image.get(2, 2), Color::WHITE);
}

#[test]
fn filled_circle() {
    let mut image = Image::new(32, 32);
    draw::circle(&mut image, 16, 16, 7).color(Color::GREEN);

    assert_eq!(image.get(16, 16), Color::GREEN);
    assert_eq!(image.get(20, 16), Color::GREEN);
    assert_eq!(image.get(16, 12), Color::GREEN);
    assert_eq!(image.get(25, 16), Color::NULL);
    assert_eq!(image.get(0, 0), Color::NULL);
}

#[test]
fn circle_partially_outside_image() {
    let mut image = Image::new(8, 8);
    draw::circle(&mut image, 0, 0, 3).color(Color::CYAN);
    assert_eq!(image.get(0, 0), Color::CYAN);
}

#[test]
fn far_off_image_shapes() {
    let mut image = Image::new(8, 8);
    draw::circle(&mut image, -(1 << 20), 4, 7);
    draw::circle(&mut image, 4, 1 << 20, 7);
    draw::line(&mut image, -(1 << 20), -(1 << 20), 1 << 20, -(1 << 20)).stroke_width(3);
    assert!(image.is_blank());
}

#[test]
fn line_covers_endpoints() {
    let mut image = Image::new(10, 3);
    draw::line(&mut image, 0, 1, 9, 1).color(Color::BLUE);
    for x in 0..10 {
        assert_eq!(image.get(x, 1), Color::BLUE, "x={x}");
    }
    assert_eq!(image.get(5, 0), Color::NULL);
}

#[test]
fn text_draws_something() {
    let mut image = Image::new(64, 20);
    draw::text(&mut image, 2, 14, "age: 30")
        .color(Color::RED)
        .align_left()
        .align_baseline();
    assert!(!image.is_blank());
}

#[test]
fn save_rejects_unsupported_extension() {
    let image = Image::new(1, 1);
    assert!(image.save("overlay.bmp").is_err());
}
