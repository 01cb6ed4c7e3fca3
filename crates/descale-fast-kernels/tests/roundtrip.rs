use descale_fast_kernels::{FilterKernel, Kernel};
use descale_fast_types::Plane;

fn texture(width: usize, height: usize) -> Plane {
    Plane::from_fn(width, height, |x, y| {
        let fx = x as f32 * 0.9;
        let fy = y as f32 * 0.6;
        0.5 + 0.25 * fx.sin() * fy.cos()
    })
    .unwrap()
}

fn max_error(a: &Plane, b: &Plane) -> f32 {
    a.data()
        .iter()
        .zip(b.data())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f32::max)
}

#[test]
fn descale_recovers_native_resolution() {
    let native = texture(16, 12);
    for kernel in [
        FilterKernel::Bilinear,
        FilterKernel::CATROM,
        FilterKernel::MITCHELL,
        FilterKernel::Lanczos { taps: 3 },
        FilterKernel::Spline36,
    ] {
        let upscaled = kernel.scale(&native, 24, 18, (0.0, 0.0)).unwrap();
        let recovered = kernel.descale(&upscaled, 16, 12, (0.0, 0.0)).unwrap();
        assert_eq!(recovered.dimensions(), (16, 12));
        let err = max_error(&recovered, &native);
        assert!(err < 1e-3, "{kernel}: max error {err}");
    }
}

#[test]
fn shifted_round_trip_is_consistent() {
    let native = texture(10, 10);
    let shift = (0.25, -0.25);
    let kernel = FilterKernel::CATROM;
    let upscaled = kernel.scale(&native, 15, 15, shift).unwrap();
    let recovered = kernel.descale(&upscaled, 10, 10, shift).unwrap();
    let rescaled = kernel.scale(&recovered, 15, 15, shift).unwrap();
    assert!(max_error(&rescaled, &upscaled) < 1e-3);
}

#[test]
fn wrong_kernel_leaves_a_residual() {
    let native = texture(16, 12);
    let upscaled = FilterKernel::Bilinear
        .scale(&native, 24, 18, (0.0, 0.0))
        .unwrap();
    let exact = FilterKernel::Bilinear
        .descale(&upscaled, 16, 12, (0.0, 0.0))
        .unwrap();
    let exact_back = FilterKernel::Bilinear
        .scale(&exact, 24, 18, (0.0, 0.0))
        .unwrap();
    let wrong = FilterKernel::Lanczos { taps: 4 }
        .descale(&upscaled, 16, 12, (0.0, 0.0))
        .unwrap();
    let wrong_back = FilterKernel::Lanczos { taps: 4 }
        .scale(&wrong, 24, 18, (0.0, 0.0))
        .unwrap();
    assert!(max_error(&wrong_back, &upscaled) > max_error(&exact_back, &upscaled));
}
