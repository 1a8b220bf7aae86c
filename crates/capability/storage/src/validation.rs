//! 作用域校验
//!
//! - ensure_scope：调用方上下文是否可以读写目标作用域
//! - ensure_same_scope：记录作用域与上下文完全一致（写入租户级数据时使用）

use crate::error::StorageError;
use domain::{Scope, TenantContext};

/// 验证调用方上下文覆盖目标作用域。
///
/// 系统级上下文可访问一切；组织级上下文只能访问本组织；租户级上下文只能访问自己。
pub fn ensure_scope(ctx: &TenantContext, scope: &Scope) -> Result<(), StorageError> {
    if ctx.scope().covers(scope) {
        return Ok(());
    }
    Err(StorageError::new("scope mismatch"))
}

/// 验证记录归属与上下文完全一致。
pub fn ensure_same_scope(ctx: &TenantContext, scope: &Scope) -> Result<(), StorageError> {
    if ctx.is_system_wide() || ctx.scope() == *scope {
        return Ok(());
    }
    Err(StorageError::new("scope mismatch"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn tenant_context_cannot_reach_sibling_tenant() {
        let org = Uuid::new_v4();
        let ctx = TenantContext::new(Some(org), Some(Uuid::new_v4()), "user-1");
        let sibling = Scope::new(Some(org), Some(Uuid::new_v4()));
        assert!(ensure_scope(&ctx, &sibling).is_err());
        assert!(ensure_scope(&ctx, &ctx.scope()).is_ok());
    }

    #[test]
    fn system_context_reaches_everything() {
        let ctx = TenantContext::system(Scope::global());
        let target = Scope::new(Some(Uuid::new_v4()), Some(Uuid::new_v4()));
        assert!(ensure_scope(&ctx, &target).is_ok());
        assert!(ensure_same_scope(&ctx, &target).is_ok());
    }
}
