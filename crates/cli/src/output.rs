//! Plain-text rendering of command results on stdout.

use tz_materials_client::CartStore;
use tz_materials_client::checkout::{CheckoutReport, Transaction};
use tz_materials_core::{
    Order, Payment, PaymentSummary, Product, Seller, SellerInvitation, User,
};

#[allow(clippy::print_stdout)]
pub fn line(text: &str) {
    println!("{text}");
}

pub fn user(user: &User) {
    line(&format!(
        "{} <{}> role={} kyc={}",
        user.full_name, user.phone, user.role, user.kyc_status
    ));
}

pub fn products(products: &[Product]) {
    if products.is_empty() {
        line("No products found.");
        return;
    }
    for p in products {
        line(&format!(
            "{}  {:<32} {} / {:<6} stock {:>5}  seller {}",
            p.id, p.name, p.price, p.unit, p.stock, p.seller
        ));
    }
}

pub fn product(p: &Product) {
    line(&format!("{} ({})", p.name, p.id));
    line(&format!("  category: {}", p.category));
    if let Some(brand) = &p.brand {
        line(&format!("  brand:    {brand}"));
    }
    line(&format!("  price:    {} per {}", p.price, p.unit));
    line(&format!("  stock:    {}", p.stock));
    line(&format!("  seller:   {}", p.seller));
    if let Some(description) = &p.description {
        line(&format!("\n{description}"));
    }
}

pub fn cart(cart: &CartStore) {
    if cart.is_empty() {
        line("Cart is empty.");
        return;
    }
    for bucket in cart.group_by_seller() {
        line(&format!("Seller {}", bucket.seller));
        for item in &bucket.items {
            line(&format!(
                "  {}  {:<32} x{:<4} {}",
                item.product.id,
                item.product.name,
                item.quantity,
                item.line_total()
            ));
        }
        line(&format!("  subtotal {}", bucket.total_amount()));
    }
    line(&format!(
        "{} unit(s), total {}",
        cart.total_count(),
        cart.total_amount()
    ));
}

pub fn order(order: &Order) {
    let total = order
        .total
        .map_or_else(|| "-".to_string(), |total| total.to_string());
    line(&format!(
        "{}  {}  {} {:>3} item(s)  total {}",
        order.display_code(),
        order.id,
        order.status,
        order.items.len(),
        total
    ));
}

pub fn orders(orders: &[Order]) {
    if orders.is_empty() {
        line("No orders yet.");
        return;
    }
    orders.iter().for_each(order);
}

pub fn payment(payment: &Payment) {
    let tx_ref = payment
        .tx_ref
        .as_ref()
        .map_or("-", |tx_ref| tx_ref.as_str());
    let provider = payment
        .provider
        .as_ref()
        .map_or("-", |provider| provider.as_str());
    line(&format!(
        "{}  order {}  {} {}  {} via {}  ref {}",
        payment.id, payment.order, payment.status, payment.amount, payment.method, provider, tx_ref
    ));
}

pub fn payments(payments: &[Payment]) {
    payments.iter().for_each(payment);
    let summary = PaymentSummary::from_payments(payments);
    line(&format!(
        "{} payment(s): {} pending, {} success, {} failed; value {}",
        summary.count(),
        summary.pending,
        summary.success,
        summary.failed,
        summary.total_value
    ));
}

pub fn transaction(tx: &Transaction) {
    if let Some(order) = tx.order() {
        self::order(order);
    }
    if let Some(payment) = tx.payment() {
        self::payment(payment);
    }
    if let Some(message) = tx.message() {
        line(message);
    }
}

pub fn report(report: &CheckoutReport) {
    orders(&report.completed);
    if let Some(partial) = &report.partial {
        line("Incomplete order:");
        order(partial);
    }
    line(&report.message());
}

pub fn seller(seller: &Seller) {
    let verified = if seller.verified { "verified" } else { "unverified" };
    line(&format!("{} ({}) {verified}", seller.business_name, seller.id));
    line(&format!("  phone: {}", seller.phone));
    if let Some(email) = &seller.email {
        line(&format!("  email: {email}"));
    }
    if let Some(tin) = &seller.tin {
        line(&format!("  TIN:   {tin}"));
    }
    if let Some(address) = &seller.address {
        line(&format!("  address: {address}"));
    }
    for member in &seller.members {
        line(&format!(
            "  member {} {} ({})",
            member.role, member.user.full_name, member.user.phone
        ));
    }
}

pub fn invitation(invitation: &SellerInvitation) {
    line(&format!(
        "#{} {} <{}> {} as {} for {} [{}]",
        invitation.id,
        invitation.email,
        invitation.phone,
        invitation.status,
        invitation.role,
        invitation.seller_name,
        invitation.token
    ));
}

pub fn invitations(invitations: &[SellerInvitation]) {
    if invitations.is_empty() {
        line("No invitations.");
        return;
    }
    invitations.iter().for_each(invitation);
}
