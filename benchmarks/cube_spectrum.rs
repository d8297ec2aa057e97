/// Spectrum of the unit cube under mesh refinement
///
/// The lowest non-zero Neumann eigenvalue of the Laplacian on [0,1]³ is π²
/// (multiplicity 3). P1 elements with consistent mass approach it from above
/// at second order in h.

use std::time::Instant;

use fracture_modes::{
    Assembler, DenseEigenSolver, EigenProblem, GeneralizedEigenSolver, IsotropicElasticity, MeshGenerator,
    ShiftInvertLanczos,
};

fn lowest_eigenvalues(n: usize, solver: &dyn GeneralizedEigenSolver) -> fracture_modes::Result<(Vec<f64>, usize, f64)> {
    let mesh = MeshGenerator::generate_box(n, n, n, 1.0, 1.0, 1.0)?;
    let operators = Assembler::assemble_operators(&mesh, 1, &IsotropicElasticity::default())?;
    let null_space = operators.rigid_modes(&mesh);
    let problem = EigenProblem::new(&operators, &null_space, 1e-6);

    let start = Instant::now();
    let pairs = solver.smallest_eigenpairs(&problem, 3)?;
    let elapsed = start.elapsed().as_secs_f64();
    Ok((pairs.iter().map(|p| p.value).collect(), operators.num_dofs(), elapsed))
}

fn main() -> fracture_modes::Result<()> {
    println!("=== Unit cube spectrum (scalar field) ===\n");
    let exact = std::f64::consts::PI.powi(2);
    println!("Exact lowest eigenvalue: π² = {:.6}\n", exact);

    let lanczos = ShiftInvertLanczos::default();
    println!("{:>4} {:>8} {:>12} {:>12} {:>12} {:>10} {:>8}", "n", "dofs", "λ1", "λ2", "λ3", "error", "time");

    let mut previous: Option<(f64, f64)> = None;
    for n in [2, 3, 4, 6, 8, 12] {
        let solver: &dyn GeneralizedEigenSolver = if n <= 6 { &DenseEigenSolver } else { &lanczos };
        let (values, dofs, elapsed) = lowest_eigenvalues(n, solver)?;
        let error = (values[0] - exact) / exact;
        println!(
            "{:>4} {:>8} {:>12.6} {:>12.6} {:>12.6} {:>10.2e} {:>7.3}s",
            n, dofs, values[0], values[1], values[2], error, elapsed
        );

        let h = 1.0 / n as f64;
        if let Some((h_prev, e_prev)) = previous {
            println!("     observed order: {:.2}", (e_prev / error).ln() / (h_prev / h).ln());
        }
        previous = Some((h, error));
    }

    println!("\n=== Dense vs Lanczos at n = 5 ===\n");
    let (dense, _, t_dense) = lowest_eigenvalues(5, &DenseEigenSolver)?;
    let (krylov, _, t_krylov) = lowest_eigenvalues(5, &lanczos)?;
    for (k, (a, b)) in dense.iter().zip(&krylov).enumerate() {
        println!("  λ{} dense {:.10}  lanczos {:.10}  diff {:.2e}", k + 1, a, b, (a - b).abs());
    }
    println!("  time: dense {:.3}s, lanczos {:.3}s", t_dense, t_krylov);

    Ok(())
}
