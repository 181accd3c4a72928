/*!
 * Authenticated principal extractor
 *
 * Responsibility:
 * - handler に認証済み Principal を渡す
 * - 検証そのものは middleware (gate) の責務。ここは extensions から読むだけ
 */

mod core;

pub use self::core::CurrentPrincipal;
